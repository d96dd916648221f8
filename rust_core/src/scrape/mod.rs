//! Structural extraction from the score source's HTML. No cricket semantics live here.

pub mod live_scores;
pub mod scorecard;

pub use live_scores::{extract_fragments, FragmentSelectors};
pub use scorecard::{parse_scorecard, BatterLine, BowlerLine, InningsHeader, Scorecard};

use scraper::{ElementRef, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Whitespace-normalized text of one element.
pub(crate) fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of every match of `sel` under `el`, joined with single spaces. Empty when nothing matches.
pub(crate) fn select_text(el: &ElementRef, sel: &Selector) -> String {
    el.select(sel)
        .map(|e| element_text(&e))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
