use super::{select_text, selector, ExtractError};
use crate::models::MatchFragment;
use scraper::{ElementRef, Html, Selector};

/// Compiled selectors for the live-scores listing page.
#[derive(Debug)]
pub struct FragmentSelectors {
    container: Selector,
    heading: Selector,
    venue: Selector,
    batting: Selector,
    bowling: Selector,
    team_name: Selector,
    team_score: Selector,
    live: Selector,
    complete: Selector,
    link: Selector,
}

impl FragmentSelectors {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            container: selector("div.cb-mtch-lst.cb-tms-itm")?,
            heading: selector("h3.cb-lv-scr-mtch-hdr a")?,
            venue: selector("span")?,
            batting: selector("div.cb-hmscg-bat-txt")?,
            bowling: selector("div.cb-hmscg-bwl-txt")?,
            team_name: selector("div.cb-hmscg-tm-nm")?,
            team_score: selector("div.cb-hmscg-tm-nm + div")?,
            live: selector("div.cb-text-live")?,
            complete: selector("div.cb-text-complete")?,
            link: selector("a.cb-lv-scrs-well.cb-lv-scrs-well-live")?,
        })
    }

    /// One fragment per match block, in page order. Blocks with missing parts still
    /// produce a fragment; the normalizer decides what is usable.
    pub fn extract(&self, html: &str) -> Vec<MatchFragment> {
        let document = Html::parse_document(html);
        document
            .select(&self.container)
            .map(|block| self.fragment(&block))
            .collect()
    }

    fn fragment(&self, block: &ElementRef) -> MatchFragment {
        let (batting_team, batting_score) = self.side(block, &self.batting);
        let (bowling_team, bowling_score) = self.side(block, &self.bowling);

        MatchFragment {
            team_heading: select_text(block, &self.heading),
            match_number_venue: select_text(block, &self.venue),
            batting_team,
            batting_score,
            bowling_team,
            bowling_score,
            live_text: select_text(block, &self.live),
            completion_text: select_text(block, &self.complete),
            link: block
                .select(&self.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .unwrap_or_default()
                .to_string(),
        }
    }

    fn side(&self, block: &ElementRef, side: &Selector) -> (String, String) {
        let mut names = Vec::new();
        let mut scores = Vec::new();
        for el in block.select(side) {
            names.push(select_text(&el, &self.team_name));
            scores.push(select_text(&el, &self.team_score));
        }
        (join_non_empty(names), join_non_empty(scores))
    }
}

fn join_non_empty(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convenience wrapper compiling the selectors for a single page.
pub fn extract_fragments(html: &str) -> Result<Vec<MatchFragment>, ExtractError> {
    Ok(FragmentSelectors::new()?.extract(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
      <div class="cb-col cb-col-100 cb-plyr-tbody cb-rank-hdr cb-lv-main">
        <div class="cb-mtch-lst cb-col cb-col-100 cb-tms-itm">
          <h3 class="cb-lv-scr-mtch-hdr inline-block">
            <a href="/live-cricket-scores/1/ind-vs-aus" title="India vs Australia">India vs Australia, </a>
          </h3>
          <div><span class="text-gray">3rd ODI</span> <span class="text-gray">• Melbourne Cricket Ground</span></div>
          <a class="cb-lv-scrs-well cb-lv-scrs-well-live" href="/live-cricket-scores/1/ind-vs-aus">
            <div class="cb-hmscg-bat-txt cb-ovr-flo">
              <div class="cb-ovr-flo cb-hmscg-tm-nm">IND</div>
              <div class="cb-ovr-flo" style="display:inline-block">240/3 (43.2)</div>
            </div>
            <div class="cb-hmscg-bwl-txt">
              <div class="cb-ovr-flo cb-hmscg-tm-nm">AUS</div>
              <div class="cb-ovr-flo">  </div>
            </div>
            <div class="cb-text-live">India opt to bat</div>
          </a>
        </div>
        <div class="cb-mtch-lst cb-col cb-col-100 cb-tms-itm">
          <h3 class="cb-lv-scr-mtch-hdr inline-block"><a href="/x">Unlisted vs Nobody</a></h3>
        </div>
      </div>
    </body></html>
    "#;

    #[test]
    fn test_extracts_one_fragment_per_block() {
        let fragments = extract_fragments(PAGE).unwrap();
        assert_eq!(fragments.len(), 2);

        let first = &fragments[0];
        assert_eq!(first.team_heading, "India vs Australia,");
        assert_eq!(first.match_number_venue, "3rd ODI • Melbourne Cricket Ground");
        assert_eq!(first.batting_team, "IND");
        assert_eq!(first.batting_score, "240/3 (43.2)");
        assert_eq!(first.bowling_team, "AUS");
        assert_eq!(first.bowling_score, "");
        assert_eq!(first.live_text, "India opt to bat");
        assert_eq!(first.completion_text, "");
        assert_eq!(first.link, "/live-cricket-scores/1/ind-vs-aus");
    }

    #[test]
    fn test_sparse_block_keeps_empty_fields() {
        let fragments = extract_fragments(PAGE).unwrap();
        let sparse = &fragments[1];
        assert_eq!(sparse.team_heading, "Unlisted vs Nobody");
        assert_eq!(sparse.batting_score, "");
        assert_eq!(sparse.link, "");
    }

    #[test]
    fn test_page_without_matches() {
        assert!(extract_fragments("<html><body><p>No live matches</p></body></html>")
            .unwrap()
            .is_empty());
    }
}
