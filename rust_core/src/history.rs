//! In-memory per-match innings history feeding the score charts.

use crate::models::MatchRecord;
use crate::parsing::parse_innings;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    pub match_id: i64,
    pub team_name: String,
    pub innings_number: u32,
    pub runs: u32,
    pub wickets: Option<u32>,
    pub declared: bool,
    pub follow_on: bool,
    pub timestamp: DateTime<Utc>,
}

impl ScoreHistoryEntry {
    /// Chart label, e.g. "Innings 2 (f/o)".
    pub fn label(&self) -> String {
        let mut label = format!("Innings {}", self.innings_number);
        if self.declared {
            label.push_str(" (d)");
        }
        if self.follow_on {
            label.push_str(" (f/o)");
        }
        label
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub runs: u32,
}

/// One team's bars for a match chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub team: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Default)]
pub struct ScoreHistory {
    entries: RwLock<HashMap<i64, Vec<ScoreHistoryEntry>>>,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every innings on both sides of `record`. An innings already seen for the
    /// same team is overwritten in place. Returns the number of entries written.
    pub fn update_from_record(&self, record: &MatchRecord) -> usize {
        let Some(match_id) = record.match_id else {
            debug!("Skipping history for unsaved match {}", record.team_heading);
            return 0;
        };

        let sides = [
            (&record.batting_team, &record.batting_score),
            (&record.bowling_team, &record.bowling_score),
        ];

        let mut entries = self.entries.write();
        let history = entries.entry(match_id).or_default();
        let mut written = 0;

        for (team, score) in sides {
            if team.trim().is_empty() {
                continue;
            }
            for innings in parse_innings(score) {
                let entry = ScoreHistoryEntry {
                    match_id,
                    team_name: team.clone(),
                    innings_number: innings.innings_number,
                    runs: innings.runs,
                    wickets: innings.wickets,
                    declared: innings.declared,
                    follow_on: innings.follow_on,
                    timestamp: record.last_updated,
                };
                match history
                    .iter_mut()
                    .find(|e| e.team_name == entry.team_name && e.innings_number == entry.innings_number)
                {
                    Some(slot) => *slot = entry,
                    None => history.push(entry),
                }
                written += 1;
            }
        }

        written
    }

    pub fn snapshot(&self, match_id: i64) -> Vec<ScoreHistoryEntry> {
        self.entries
            .read()
            .get(&match_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Entries grouped per team in first-seen order, innings ascending.
    pub fn chart_series(&self, match_id: i64) -> Vec<ChartSeries> {
        let mut series: Vec<ChartSeries> = Vec::new();
        let mut entries = self.snapshot(match_id);
        entries.sort_by_key(|e| e.innings_number);

        let mut team_order: Vec<String> = Vec::new();
        for e in self.snapshot(match_id) {
            if !team_order.contains(&e.team_name) {
                team_order.push(e.team_name);
            }
        }

        for team in team_order {
            let points = entries
                .iter()
                .filter(|e| e.team_name == team)
                .map(|e| ChartPoint {
                    label: e.label(),
                    runs: e.runs,
                })
                .collect();
            series.push(ChartSeries { team, points });
        }
        series
    }

    pub fn match_count(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_record;

    fn test_record(batting: &str, bowling: &str) -> MatchRecord {
        let mut record = sample_record();
        record.match_id = Some(3);
        record.batting_team = "England".to_string();
        record.batting_score = batting.to_string();
        record.bowling_team = "India".to_string();
        record.bowling_score = bowling.to_string();
        record
    }

    #[test]
    fn test_follow_on_produces_two_entries() {
        let history = ScoreHistory::new();
        let written = history.update_from_record(&test_record("187 & 45-2 f/o", ""));
        assert_eq!(written, 2);

        let entries = history.snapshot(3);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].innings_number, 1);
        assert_eq!(entries[0].runs, 187);
        assert!(!entries[0].declared);
        assert!(!entries[0].follow_on);
        assert_eq!(entries[1].innings_number, 2);
        assert_eq!(entries[1].runs, 45);
        assert!(entries[1].follow_on);
    }

    #[test]
    fn test_same_innings_overwritten() {
        let history = ScoreHistory::new();
        history.update_from_record(&test_record("120/3 (40)", "400-8 d"));
        history.update_from_record(&test_record("150/3 (48)", "400-8 d"));

        let entries = history.snapshot(3);
        assert_eq!(entries.len(), 2);
        let england = entries.iter().find(|e| e.team_name == "England").unwrap();
        assert_eq!(england.runs, 150);
    }

    #[test]
    fn test_chart_series_labels() {
        let history = ScoreHistory::new();
        history.update_from_record(&test_record("187 & 45-2 f/o", "450-7 d"));

        let series = history.chart_series(3);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].team, "England");
        assert_eq!(
            series[0].points,
            vec![
                ChartPoint {
                    label: "Innings 1".to_string(),
                    runs: 187
                },
                ChartPoint {
                    label: "Innings 2 (f/o)".to_string(),
                    runs: 45
                },
            ]
        );
        assert_eq!(series[1].team, "India");
        assert_eq!(series[1].points[0].label, "Innings 1 (d)");
    }

    #[test]
    fn test_unsaved_record_ignored() {
        let history = ScoreHistory::new();
        let mut record = test_record("100/1 (10)", "");
        record.match_id = None;
        assert_eq!(history.update_from_record(&record), 0);
        assert_eq!(history.match_count(), 0);
        assert!(history.chart_series(3).is_empty());
    }
}
