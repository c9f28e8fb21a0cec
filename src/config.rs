// Layout and column configuration for the daily sales sheets.
//
// Every field has a serde default, so a config file only needs the keys it
// changes. Without a file the built-in layout is used.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fixed-position layout of one daily sheet (all indices 0-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Row of the cell holding the sheet's reporting date
    pub date_row: usize,
    pub date_col: usize,
    /// Upper header row; its label is the column name
    pub main_header_row: usize,
    /// Lower header row; a non-empty label becomes `"{main} ({sub})"`
    pub sub_header_row: usize,
    pub data_start_row: usize,
    /// Substring that identifies the column searched for the marker row
    pub marker_column: String,
    /// Exact value that ends the room section of a sheet
    pub marker_value: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            date_row: 2,
            date_col: 0,
            main_header_row: 3,
            sub_header_row: 4,
            data_start_row: 6,
            marker_column: "Particulars".to_string(),
            marker_value: "Function Room".to_string(),
        }
    }
}

/// Exact column names the normalizer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub date: String,
    pub particulars: String,
    pub rooms: String,
    pub rates: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            particulars: "Particulars".to_string(),
            rooms: "No. of Rooms".to_string(),
            rates: "Rooms Rates".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub layout: SheetLayout,
    pub columns: ColumnNames,
    pub currency_symbol: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            columns: ColumnNames::default(),
            currency_symbol: "₱".to_string(),
        }
    }
}

impl ReportConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load the config file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                let config = Self::from_toml_str(&text)?;
                log::debug!("Loaded layout config from {}", p.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ReportConfig::from_toml_str(
            r#"
            [layout]
            data_start_row = 7
            marker_value = "Function Hall"
            "#,
        )
        .unwrap();

        assert_eq!(config.layout.data_start_row, 7);
        assert_eq!(config.layout.marker_value, "Function Hall");
        assert_eq!(config.layout.main_header_row, 3);
        assert_eq!(config.columns, ColumnNames::default());
        assert_eq!(config.currency_symbol, "₱");
    }

    #[test]
    fn test_shipped_layout_matches_defaults() {
        let config = ReportConfig::from_toml_str(include_str!("../config/layout.toml")).unwrap();
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = ReportConfig::from_toml_str("[layout]\ndate_row = \"two\"").unwrap_err();
        assert!(matches!(err, crate::error::ReportError::Config(_)));
    }

    #[test]
    fn test_missing_path_uses_defaults() {
        assert_eq!(ReportConfig::load(None).unwrap(), ReportConfig::default());
    }
}
