//! Toss extraction from the live status line ("India opt to bowl").

use crate::models::TossDecision;

/// Raw toss result as read from text. The winner is lower-cased source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedToss {
    pub winner: String,
    pub decision: TossDecision,
}

/// Extract the toss from a live status line.
///
/// Returns `None` when the text carries no toss phrase; no winner is ever invented.
pub fn extract_toss(live_text: &str) -> Option<ExtractedToss> {
    let text = live_text.to_lowercase();
    if !text.contains("opt to") && !text.contains("opted to") {
        return None;
    }

    let winner = text.split("opt").next().unwrap_or_default().trim();
    if winner.is_empty() {
        return None;
    }

    let decision = if text.contains("bowl") {
        TossDecision::Field
    } else {
        TossDecision::Bat
    };

    Some(ExtractedToss {
        winner: winner.to_string(),
        decision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opt_to_bowl() {
        let toss = extract_toss("Australia opt to bowl").unwrap();
        assert_eq!(toss.winner, "australia");
        assert_eq!(toss.decision, TossDecision::Field);
    }

    #[test]
    fn test_opted_to_bat() {
        let toss = extract_toss("New Zealand Women opted to bat").unwrap();
        assert_eq!(toss.winner, "new zealand women");
        assert_eq!(toss.decision, TossDecision::Bat);
    }

    #[test]
    fn test_no_toss_phrase() {
        assert_eq!(extract_toss("India need 42 runs in 30 balls"), None);
        assert_eq!(extract_toss(""), None);
        assert_eq!(extract_toss("Rain stops play"), None);
    }

    #[test]
    fn test_phrase_without_winner() {
        assert_eq!(extract_toss("opted to bat"), None);
    }
}
