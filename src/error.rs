// Error type shared by the pipeline stages.
//
// Only structural problems end up here. Bad cells (dates, numbers, blank
// headers) degrade to null/zero inside the parser and normalizer instead.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("required column \"{column}\" was not found in any input sheet")]
    MissingColumn { column: String },

    #[error("room identifier \"{id}\" appears more than once in the room taxonomy")]
    DuplicateRoom { id: String },

    #[error("room taxonomy entry #{index} has an empty room identifier")]
    BlankRoom { index: usize },

    #[error("room taxonomy entry #{index}: group \"{group}\" cannot be used as a sheet name: {reason}")]
    InvalidGroup {
        index: usize,
        group: String,
        reason: String,
    },

    #[error("room taxonomy has no rooms")]
    EmptyTaxonomy,

    #[error("input workbook has no sheets")]
    NoSheets,

    #[error("unsupported input file {path}: {reason}")]
    UnsupportedInput { path: String, reason: String },

    #[error("could not write {path}")]
    WriteOutput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, ReportError>;
