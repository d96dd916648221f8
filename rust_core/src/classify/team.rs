//! Team code -> full name standardization.

use crate::lookup::{read_mappings, LookupTable};
use anyhow::Result;
use std::path::Path;

const DEFAULT_TEAMS: &[(&str, &str)] = &[
    ("AUS", "Australia"),
    ("PAK", "Pakistan"),
    ("IND", "India"),
    ("ENG", "England"),
    ("NZ", "New Zealand"),
    ("SA", "South Africa"),
    ("WI", "West Indies"),
    ("SL", "Sri Lanka"),
    ("BAN", "Bangladesh"),
    ("AFG", "Afghanistan"),
    ("ZIM", "Zimbabwe"),
    ("IRE", "Ireland"),
    ("SCO", "Scotland"),
    ("UAE", "United Arab Emirates"),
    ("NEP", "Nepal"),
];

/// Team code directory. Codes are stored upper-case.
#[derive(Debug)]
pub struct TeamDirectory {
    table: LookupTable,
}

impl Default for TeamDirectory {
    fn default() -> Self {
        Self::with_table(LookupTable::from_pairs(DEFAULT_TEAMS))
    }
}

impl TeamDirectory {
    pub fn with_table(table: LookupTable) -> Self {
        Self { table }
    }

    /// Register a team code learned at runtime.
    pub fn add(&self, code: &str, full_name: &str) {
        self.table.add(&code.trim().to_uppercase(), full_name);
    }

    /// Merge codes from a JSON file; keys go through `add` so they match any case.
    pub fn load_json(&self, path: &Path) -> Result<usize> {
        let mappings = read_mappings(path)?;
        let count = mappings.len();
        for (code, full_name) in mappings {
            self.add(&code, &full_name);
        }
        Ok(count)
    }

    /// Full name for a code; anything unrecognised comes back trimmed but otherwise untouched.
    pub fn standardize(&self, team: &str) -> String {
        let cleaned = team.trim();
        if cleaned.is_empty() || self.table.contains_value(cleaned) {
            return cleaned.to_string();
        }

        self.table
            .get(&cleaned.to_uppercase())
            .unwrap_or_else(|| cleaned.to_string())
    }

    /// True when both names standardize to the same team (case-insensitive).
    pub fn same_team(&self, a: &str, b: &str) -> bool {
        let a = self.standardize(a);
        let b = self.standardize(b);
        !a.is_empty() && a.eq_ignore_ascii_case(&b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lookup_is_case_insensitive() {
        let teams = TeamDirectory::default();
        assert_eq!(teams.standardize("AUS"), "Australia");
        assert_eq!(teams.standardize("aus"), "Australia");
        assert_eq!(teams.standardize(" nz "), "New Zealand");
    }

    #[test]
    fn test_full_names_pass_through() {
        let teams = TeamDirectory::default();
        assert_eq!(teams.standardize("Australia"), "Australia");
        assert_eq!(teams.standardize("  Sri Lanka "), "Sri Lanka");
    }

    #[test]
    fn test_unknown_input_preserved() {
        let teams = TeamDirectory::default();
        assert_eq!(teams.standardize("Mumbai Indians"), "Mumbai Indians");
        assert_eq!(teams.standardize(" Perth Scorchers Women "), "Perth Scorchers Women");
        assert_eq!(teams.standardize("NAM"), "NAM");
        assert_eq!(teams.standardize(""), "");
    }

    #[test]
    fn test_runtime_extension() {
        let teams = TeamDirectory::default();
        teams.add("nam", "Namibia");
        assert_eq!(teams.standardize("NAM"), "Namibia");
        assert_eq!(teams.standardize("Nam"), "Namibia");
    }

    #[test]
    fn test_same_team() {
        let teams = TeamDirectory::default();
        assert!(teams.same_team("IND", "India"));
        assert!(teams.same_team("india", "INDIA"));
        assert!(!teams.same_team("IND", "Australia"));
        assert!(!teams.same_team("", ""));
    }

    #[test]
    fn test_codes_loaded_from_json_match_any_case() {
        let dir = std::env::temp_dir().join(format!("team_codes_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("teams.json");
        std::fs::write(&path, r#"{"nam": "Namibia", "Oma": "Oman"}"#).unwrap();

        let teams = TeamDirectory::default();
        assert_eq!(teams.load_json(&path).unwrap(), 2);
        assert_eq!(teams.standardize("NAM"), "Namibia");
        assert_eq!(teams.standardize("nam"), "Namibia");
        assert_eq!(teams.standardize("OMA"), "Oman");

        std::fs::remove_dir_all(&dir).ok();
    }
}
