//! Venue -> city classification.
//!
//! The match-number/venue string looks like `"3rd ODI • Melbourne Cricket Ground"`
//! or `"Match 7 • at Dubai, Dubai International Cricket Stadium"`. The stadium table
//! is tried first; otherwise the last comma-separated segment is taken as the city.

use crate::lookup::LookupTable;
use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Bullet separator, plus its mis-decoded UTF-8 form which the page sometimes serves.
const BULLETS: &[&str] = &["•", "â€¢"];

static RE_AT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*at(?:\s+|$)").expect("at-prefix pattern compiles"));

static RE_PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*\)").expect("parenthetical pattern compiles"));

const DEFAULT_STADIUMS: &[(&str, &str)] = &[
    // India
    ("Narendra Modi Stadium", "Ahmedabad"),
    ("M Chinnaswamy Stadium", "Bangalore"),
    ("Arun Jaitley Stadium", "Delhi"),
    ("Eden Gardens", "Kolkata"),
    ("Wankhede Stadium", "Mumbai"),
    ("MA Chidambaram Stadium", "Chennai"),
    ("Punjab Cricket Association Stadium", "Chandigarh"),
    ("Rajiv Gandhi International Stadium", "Hyderabad"),
    ("Bharat Ratna Shri Atal Bihari Vajpayee Ekana Cricket Stadium", "Lucknow"),
    ("Holkar Stadium", "Indore"),
    // Rest of the world
    ("Melbourne Cricket Ground", "Melbourne"),
    ("Sydney Cricket Ground", "Sydney"),
    ("The Gabba", "Brisbane"),
    ("Adelaide Oval", "Adelaide"),
    ("WACA Ground", "Perth"),
    ("Lord's Cricket Ground", "London"),
    ("The Oval", "London"),
    ("Trent Bridge", "Nottingham"),
    ("Headingley", "Leeds"),
    ("Old Trafford", "Manchester"),
    ("Eden Park", "Auckland"),
    ("Basin Reserve", "Wellington"),
    ("Hagley Oval", "Christchurch"),
    ("R Premadasa Stadium", "Colombo"),
    ("R.Premadasa Stadium", "Colombo"),
    ("Premadasa Stadium", "Colombo"),
    ("Pallekele International Cricket Stadium", "Kandy"),
    ("Galle International Stadium", "Galle"),
    ("Shere Bangla National Stadium", "Dhaka"),
    ("Zahur Ahmed Chowdhury Stadium", "Chattogram"),
    ("National Stadium", "Karachi"),
    ("Gaddafi Stadium", "Lahore"),
    ("Rawalpindi Cricket Stadium", "Rawalpindi"),
    ("SuperSport Park", "Centurion"),
    ("The Wanderers Stadium", "Johannesburg"),
    ("Newlands", "Cape Town"),
    ("Kensington Oval", "Bridgetown"),
    ("Sabina Park", "Kingston"),
    ("Queens Sports Club", "Bulawayo"),
    ("Harare Sports Club", "Harare"),
    ("Dubai International Cricket Stadium", "Dubai"),
    ("Sheikh Zayed Stadium", "Abu Dhabi"),
];

/// Stadium -> city directory.
#[derive(Debug)]
pub struct StadiumDirectory {
    table: LookupTable,
}

impl Default for StadiumDirectory {
    fn default() -> Self {
        Self::with_table(LookupTable::from_pairs(DEFAULT_STADIUMS))
    }
}

impl StadiumDirectory {
    pub fn with_table(table: LookupTable) -> Self {
        Self { table }
    }

    /// Register a stadium learned at runtime.
    pub fn add(&self, stadium: &str, city: &str) {
        self.table.add(stadium, city);
    }

    /// Merge stadium -> city mappings from a JSON file.
    pub fn load_json(&self, path: &Path) -> Result<usize> {
        self.table.load_json(path)
    }

    /// City for a venue string, or an empty string when nothing usable is left.
    ///
    /// An empty result means "city unknown"; callers must not substitute a placeholder.
    pub fn city_for_venue(&self, match_number_venue: &str) -> String {
        let venue = strip_match_number(match_number_venue);
        let venue = RE_AT_PREFIX.replace(venue, "");
        let venue = venue.trim();
        if venue.is_empty() {
            return String::new();
        }

        for (stadium, city) in self.table.entries_longest_first() {
            if venue.contains(stadium.as_str()) {
                return city;
            }
        }

        fallback_city(venue)
    }
}

/// Drop a `"3rd ODI • "` style prefix.
fn strip_match_number(text: &str) -> &str {
    for bullet in BULLETS {
        if let Some((_, rest)) = text.split_once(bullet) {
            // Only the segment right after the first bullet names the ground
            return rest.split(bullet).next().unwrap_or(rest).trim();
        }
    }
    text.trim()
}

/// Last comma-separated segment, without any parenthetical suffix.
fn fallback_city(venue: &str) -> String {
    let last = venue.rsplit(',').next().unwrap_or(venue).trim();
    RE_PARENTHETICAL.replace(last, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_match_after_bullet() {
        let dir = StadiumDirectory::default();
        assert_eq!(
            dir.city_for_venue("3rd ODI • Melbourne Cricket Ground"),
            "Melbourne"
        );
        assert_eq!(dir.city_for_venue("1st Test • at Eden Gardens"), "Kolkata");
    }

    #[test]
    fn test_mis_decoded_bullet() {
        let dir = StadiumDirectory::default();
        assert_eq!(dir.city_for_venue("2nd T20I â€¢ Sabina Park"), "Kingston");
    }

    #[test]
    fn test_most_specific_entry_wins() {
        let dir = StadiumDirectory::default();
        assert_eq!(
            dir.city_for_venue("1st Test • Shere Bangla National Stadium, Mirpur"),
            "Dhaka"
        );
        assert_eq!(dir.city_for_venue("Final • National Stadium"), "Karachi");
        assert_eq!(
            dir.city_for_venue("2nd ODI • R.Premadasa Stadium, Colombo"),
            "Colombo"
        );
    }

    #[test]
    fn test_fallback_splitter() {
        let dir = StadiumDirectory::default();
        assert_eq!(
            dir.city_for_venue("Match 14 • Grange Cricket Club, Edinburgh"),
            "Edinburgh"
        );
        assert_eq!(
            dir.city_for_venue("Match 2 • at Kirtipur, Tribhuvan University Ground (TU)"),
            "Tribhuvan University Ground"
        );
        assert_eq!(dir.city_for_venue("Windhoek"), "Windhoek");
    }

    #[test]
    fn test_empty_input() {
        let dir = StadiumDirectory::default();
        assert_eq!(dir.city_for_venue(""), "");
        assert_eq!(dir.city_for_venue("   "), "");
        assert_eq!(dir.city_for_venue("5th Match • "), "");
        assert_eq!(dir.city_for_venue("5th Match • at "), "");
    }

    #[test]
    fn test_runtime_extension() {
        let dir = StadiumDirectory::default();
        assert_eq!(
            dir.city_for_venue("1st T20I • Tolerance Oval"),
            "Tolerance Oval"
        );

        dir.add("Tolerance Oval", "Abu Dhabi");
        assert_eq!(dir.city_for_venue("1st T20I • Tolerance Oval"), "Abu Dhabi");
    }

    #[test]
    fn test_stadiums_loaded_from_json() {
        let dir = std::env::temp_dir().join(format!("stadiums_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stadiums.json");
        std::fs::write(&path, r#"{"Tolerance Oval": "Abu Dhabi"}"#).unwrap();

        let stadiums = StadiumDirectory::default();
        assert_eq!(stadiums.load_json(&path).unwrap(), 1);
        assert_eq!(stadiums.city_for_venue("1st T20I • Tolerance Oval"), "Abu Dhabi");

        std::fs::remove_dir_all(&dir).ok();
    }
}
