//! Scorecard page parsing: innings header plus batter and bowler lines.
//!
//! Column access is bounds-checked. Counting columns (balls, fours, sixes, maidens)
//! default to zero when absent; figures where zero would be a lie (runs, strike rate,
//! overs, wickets, economy) stay `None`.

use super::{element_text, select_text, selector, ExtractError};
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MIN_BOWLER_COLUMNS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsHeader {
    pub team: String,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterLine {
    pub name: String,
    pub dismissal: String,
    pub runs: Option<u32>,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlerLine {
    pub name: String,
    pub overs: Option<f64>,
    pub maidens: u32,
    pub runs: Option<u32>,
    pub wickets: Option<u32>,
    pub economy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub header: Option<InningsHeader>,
    pub batters: Vec<BatterLine>,
    pub bowlers: Vec<BowlerLine>,
}

pub fn parse_scorecard(html: &str) -> Result<Scorecard, ExtractError> {
    let header_sel = selector("div.cb-col.cb-scrd-hdr-rw")?;
    let first_span = selector("span")?;
    let right_span = selector("span.pull-right")?;
    let row_sel = selector("div.cb-col.cb-col-100.cb-scrd-itms")?;
    let player_link = selector("a.cb-text-link")?;
    let dismissal_col = selector("div.cb-col-33")?;
    let dismissal_text = selector("div.cb-col-33 span.text-gray")?;
    let stat_cols = selector("div.cb-col-8.text-right")?;
    let any_col = selector("div.cb-col")?;

    let document = Html::parse_document(html);
    let mut card = Scorecard::default();

    card.header = document.select(&header_sel).next().map(|hdr| InningsHeader {
        team: hdr
            .select(&first_span)
            .next()
            .map(|s| element_text(&s))
            .unwrap_or_default(),
        score: select_text(&hdr, &right_span),
    });

    for row in document.select(&row_sel) {
        if row.select(&dismissal_col).next().is_some() {
            let Some(name) = row.select(&player_link).next().map(|a| element_text(&a)) else {
                continue;
            };
            let stats: Vec<String> = row.select(&stat_cols).map(|c| element_text(&c)).collect();
            card.batters.push(BatterLine {
                name,
                dismissal: select_text(&row, &dismissal_text),
                runs: column(&stats, 0),
                balls: column(&stats, 1).unwrap_or(0),
                fours: column(&stats, 2).unwrap_or(0),
                sixes: column(&stats, 3).unwrap_or(0),
                strike_rate: column(&stats, 4),
            });
            continue;
        }

        let cols: Vec<String> = row.select(&any_col).map(|c| element_text(&c)).collect();
        if cols.len() < MIN_BOWLER_COLUMNS {
            debug!("Skipping scorecard row with {} columns", cols.len());
            continue;
        }
        let name = row
            .select(&player_link)
            .next()
            .map(|a| element_text(&a))
            .unwrap_or_else(|| cols[0].clone());
        if name.is_empty() || name.eq_ignore_ascii_case("bowler") {
            continue;
        }
        card.bowlers.push(BowlerLine {
            name,
            overs: column(&cols, 1),
            maidens: column(&cols, 2).unwrap_or(0),
            runs: column(&cols, 3),
            wickets: column(&cols, 4),
            economy: column(&cols, 5),
        });
    }

    Ok(card)
}

fn column<T: std::str::FromStr>(cols: &[String], idx: usize) -> Option<T> {
    cols.get(idx).and_then(|c| c.trim().parse().ok())
}
