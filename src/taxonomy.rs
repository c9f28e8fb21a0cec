// Room taxonomy: which room type and property section each room belongs to.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::excel::SUMMARY_SHEET;

/// Excel's limit on worksheet name length.
const MAX_SHEET_NAME: usize = 31;
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Every group becomes a worksheet name, so it has to be one Excel accepts.
fn sheet_name_problem(group: &str) -> Option<&'static str> {
    if group.is_empty() {
        Some("it is empty")
    } else if group.chars().count() > MAX_SHEET_NAME {
        Some("it is longer than 31 characters")
    } else if group.contains(&INVALID_SHEET_CHARS[..]) {
        Some("it contains one of [ ] : * ? / \\")
    } else if group.starts_with('\'') || group.ends_with('\'') {
        Some("it starts or ends with an apostrophe")
    } else if group.eq_ignore_ascii_case(SUMMARY_SHEET) {
        Some("the name is reserved for the summary sheet")
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMapping {
    pub id: String,
    pub room_type: String,
    pub group: String,
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    rooms: Vec<RoomMapping>,
}

/// Read-only room lookup, built once per run and passed to the stages that
/// need it.
#[derive(Debug, Clone)]
pub struct RoomTaxonomy {
    rooms: Vec<RoomMapping>,
    index: HashMap<String, usize>,
}

impl RoomTaxonomy {
    /// Build the taxonomy, trimming identifiers and rejecting blanks and
    /// duplicates.
    pub fn new(rooms: Vec<RoomMapping>) -> Result<Self> {
        if rooms.is_empty() {
            return Err(ReportError::EmptyTaxonomy);
        }
        let mut index = HashMap::with_capacity(rooms.len());
        let mut cleaned = Vec::with_capacity(rooms.len());
        // Sheet names compare case-insensitively.
        let mut sheet_names: HashMap<String, String> = HashMap::new();
        for (i, room) in rooms.into_iter().enumerate() {
            let id = room.id.trim().to_string();
            if id.is_empty() {
                return Err(ReportError::BlankRoom { index: i + 1 });
            }
            if index.insert(id.clone(), i).is_some() {
                return Err(ReportError::DuplicateRoom { id });
            }
            let group = room.group.trim().to_string();
            let invalid = |reason: String| ReportError::InvalidGroup {
                index: i + 1,
                group: group.clone(),
                reason,
            };
            if let Some(reason) = sheet_name_problem(&group) {
                return Err(invalid(reason.to_string()));
            }
            let seen = sheet_names
                .entry(group.to_lowercase())
                .or_insert_with(|| group.clone());
            if *seen != group {
                return Err(invalid(format!("it clashes with group \"{}\"", seen)));
            }
            cleaned.push(RoomMapping {
                id,
                room_type: room.room_type.trim().to_string(),
                group,
            });
        }
        Ok(Self {
            rooms: cleaned,
            index,
        })
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: TaxonomyFile = toml::from_str(s)?;
        Self::new(file.rooms)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let taxonomy = Self::from_toml_str(&text)?;
        log::info!(
            "Loaded room taxonomy from {} ({} rooms, {} groups)",
            path.display(),
            taxonomy.len(),
            taxonomy.groups().len()
        );
        Ok(taxonomy)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn lookup(&self, id: &str) -> Option<&RoomMapping> {
        self.index.get(id).map(|&i| &self.rooms[i])
    }

    /// Room groups in the order they first appear.
    pub fn groups(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rooms
            .iter()
            .map(|r| r.group.as_str())
            .filter(|g| seen.insert(*g))
            .collect()
    }

    /// Room types of `group` in the order they first appear.
    pub fn room_types(&self, group: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rooms
            .iter()
            .filter(|r| r.group == group)
            .map(|r| r.room_type.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    pub fn identifiers(&self, room_type: &str, group: &str) -> Vec<&str> {
        self.rooms
            .iter()
            .filter(|r| r.room_type == room_type && r.group == group)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Number of distinct rooms of this type in this group. Identifiers are
    /// unique, so this is a plain count.
    pub fn total_rooms(&self, room_type: &str, group: &str) -> usize {
        self.rooms
            .iter()
            .filter(|r| r.room_type == room_type && r.group == group)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str, room_type: &str, group: &str) -> RoomMapping {
        RoomMapping {
            id: id.to_string(),
            room_type: room_type.to_string(),
            group: group.to_string(),
        }
    }

    #[test]
    fn test_duplicate_identifier_is_rejected() {
        let err = RoomTaxonomy::new(vec![
            room("Room 201A", "Deluxe", "Pamana"),
            room(" Room 201A ", "Triple", "Pamana"),
        ])
        .unwrap_err();
        match err {
            ReportError::DuplicateRoom { id } => assert_eq!(id, "Room 201A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_and_empty_taxonomies_are_rejected() {
        assert!(matches!(
            RoomTaxonomy::new(vec![]),
            Err(ReportError::EmptyTaxonomy)
        ));
        assert!(matches!(
            RoomTaxonomy::new(vec![room("  ", "Deluxe", "Pamana")]),
            Err(ReportError::BlankRoom { index: 1 })
        ));
    }

    #[test]
    fn test_group_must_be_a_valid_sheet_name() {
        let reason_for = |group: &str| match RoomTaxonomy::new(vec![
            room("P1", "Studio", "Pamana"),
            room("X1", "Studio", group),
        ]) {
            Err(ReportError::InvalidGroup { index, group, reason }) => {
                assert_eq!(index, 2);
                Some((group, reason))
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => None,
        };

        assert_eq!(
            reason_for("Annex Wing One, Beach Side Rooms").map(|(_, r)| r),
            Some("it is longer than 31 characters".to_string())
        );
        assert!(reason_for("Annex/Garden").is_some());
        assert!(reason_for("   ").is_some());
        assert!(reason_for("summary").is_some());
        assert_eq!(
            reason_for("pamana"),
            Some((
                "pamana".to_string(),
                "it clashes with group \"Pamana\"".to_string()
            ))
        );
        assert!(reason_for(" Annex ").is_none());
    }

    #[test]
    fn test_groups_and_types_keep_first_appearance_order() {
        let taxonomy = RoomTaxonomy::new(vec![
            room("B1", "Double", "Annex"),
            room("P1", "Studio", "Pamana"),
            room("P2", "Dorm", "Pamana"),
            room("P3", "Studio", "Pamana"),
        ])
        .unwrap();

        assert_eq!(taxonomy.groups(), vec!["Annex", "Pamana"]);
        assert_eq!(taxonomy.room_types("Pamana"), vec!["Studio", "Dorm"]);
        assert_eq!(taxonomy.identifiers("Studio", "Pamana"), vec!["P1", "P3"]);
        assert_eq!(taxonomy.total_rooms("Studio", "Pamana"), 2);
        assert_eq!(taxonomy.total_rooms("Studio", "Annex"), 0);
        assert_eq!(taxonomy.lookup("P2").map(|r| r.room_type.as_str()), Some("Dorm"));
        assert!(taxonomy.lookup("Room 999").is_none());
    }

    #[test]
    fn test_shipped_taxonomy_loads() {
        let taxonomy = RoomTaxonomy::from_toml_str(include_str!("../config/rooms.toml")).unwrap();
        assert_eq!(taxonomy.len(), 25);
        assert_eq!(taxonomy.groups(), vec!["Pamana", "Annex"]);
        assert_eq!(taxonomy.total_rooms("Studio Room - Seaview", "Pamana"), 4);
        assert_eq!(
            taxonomy.lookup("Bahay Kubo").map(|r| r.group.as_str()),
            Some("Annex")
        );
    }
}
