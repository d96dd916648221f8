//! Runtime-extensible string lookup tables.
//!
//! This module provides:
//! - A shared key -> value table with `add` for callers that learn new mappings
//! - Longest-key-first iteration for substring matching
//! - Merging mappings from a JSON file (`{"key": "value", ...}`)

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Key -> value table shared between classifiers.
///
/// Interior mutability lets one instance, built at start-up and handed out by
/// `Arc`, be extended while the pipeline is running.
#[derive(Debug, Default)]
pub struct LookupTable {
    entries: RwLock<HashMap<String, String>>,
}

impl LookupTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from static pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let table = Self::new();
        for (key, value) in pairs {
            table.add(key, value);
        }
        table
    }

    /// Insert or replace a mapping.
    pub fn add(&self, key: &str, value: &str) {
        self.entries
            .write()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.entries.read().values().any(|v| v == value)
    }

    /// All entries, longest key first (ties broken alphabetically so results are stable).
    pub fn entries_longest_first(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    /// Merge mappings from a JSON object file. Returns how many were added.
    pub fn load_json(&self, path: &Path) -> Result<usize> {
        let mappings = read_mappings(path)?;
        let count = mappings.len();
        for (key, value) in mappings {
            self.add(&key, &value);
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Read a `{"key": "value", ...}` file.
pub fn read_mappings(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read lookup file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid lookup JSON in {}", path.display()))
}
