//! Parsers for the HTML progress pages.
//!
//! These mirror the live page structure: the award page groups boxes under
//! one container div per category, and the post page lists one box per post
//! with the post id and its credit count in successive spans.

use scraper::{Html, Selector};

use tally_roster::{AwardSnapshot, AwardState, BitSeq, CreditSnapshot, CreditState, FetchError};

/// Parse the award page into per-category earned flags.
///
/// A box counts as earned when it carries exactly one highlight span; the
/// returned count is recomputed from the flags rather than read off the page.
pub fn parse_award_page(html: &str) -> Result<AwardSnapshot, FetchError> {
    let doc = Html::parse_document(html);
    let section_sel = Selector::parse("#awards_section > div").unwrap();
    let box_sel = Selector::parse(".award_box").unwrap();
    let earned_sel = Selector::parse(".smaller.green.strong").unwrap();

    let sections: Vec<_> = doc.select(&section_sel).collect();
    if sections.len() < 3 {
        return Err(FetchError::Structure(format!(
            "award page has {} category sections, expected 3",
            sections.len()
        )));
    }

    let mut tracks: Vec<BitSeq> = Vec::with_capacity(3);
    for section in sections.iter().take(3) {
        let flags: Vec<bool> = section
            .select(&box_sel)
            .map(|award| award.select(&earned_sel).count() == 1)
            .collect();
        tracks.push(BitSeq::from(flags));
    }
    let community = tracks.pop().unwrap_or_default();
    let publication = tracks.pop().unwrap_or_default();
    let item = tracks.pop().unwrap_or_default();

    let state = AwardState::new(item, publication, community);
    Ok(AwardSnapshot {
        count: state.count_earned(),
        state,
    })
}

/// Parse the post page into per-post credit counts.
///
/// The header reads `Posts made N / Kudos earned M`.  `N` is kept; `M` is
/// discarded because the live header lags behind the per-post counts, and
/// the returned total is the sum of those instead.
pub fn parse_post_page(html: &str) -> Result<CreditSnapshot, FetchError> {
    let doc = Html::parse_document(html);
    let header_sel = Selector::parse("#posts_made_section h3").unwrap();
    let box_sel = Selector::parse("#posts_made_section .post_made_box").unwrap();
    let span_sel = Selector::parse("span").unwrap();

    let header = doc
        .select(&header_sel)
        .next()
        .ok_or_else(|| FetchError::Structure("post page has no posts section header".into()))?;
    let header_text: String = header.text().collect();
    let (posts_part, _stale_total) = header_text.split_once(" / ").ok_or_else(|| {
        FetchError::Structure(format!("unrecognized post header {header_text:?}"))
    })?;
    let post_count = third_token(posts_part)?;

    let mut state = CreditState::default();
    for post_box in doc.select(&box_sel) {
        let mut spans = post_box.select(&span_sel);
        let post = span_int(spans.next(), "post id")?;
        let credits = span_int(spans.next(), "credit count")?;
        state.insert(post, credits);
    }

    Ok(CreditSnapshot {
        post_count,
        total: state.total(),
        state,
    })
}

fn third_token(text: &str) -> Result<u32, FetchError> {
    text.split(' ')
        .nth(2)
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| FetchError::Structure(format!("unrecognized post header {text:?}")))
}

fn span_int(span: Option<scraper::ElementRef<'_>>, what: &str) -> Result<u32, FetchError> {
    let span =
        span.ok_or_else(|| FetchError::Structure(format!("post box is missing its {what}")))?;
    let text: String = span.text().collect();
    text.trim()
        .parse()
        .map_err(|_| FetchError::Structure(format!("post box has non-numeric {what}: {text:?}")))
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tally_roster::AwardCategory;

    const AWARD_PAGE: &str = r#"
        <html><body>
        <div id="awards_section">
            <div>
                <div class="award_box"><span class="smaller green strong">Earned</span></div>
                <div class="award_box"><span class="smaller">Locked</span></div>
                <div class="award_box"><span class="smaller green strong">Earned</span></div>
            </div>
            <div>
                <div class="award_box"><span class="smaller">Locked</span></div>
            </div>
            <div>
                <div class="award_box"><span class="smaller green strong">Earned</span></div>
            </div>
        </div>
        </body></html>"#;

    const POST_PAGE: &str = r#"
        <html><body>
        <div id="posts_made_section">
            <h3>Posts made 2 / Kudos earned 34</h3>
            <div class="post_made_box"><span>107</span><span>5</span></div>
            <div class="post_made_box"><span>108</span><span>2</span></div>
        </div>
        </body></html>"#;

    #[test]
    fn award_page_yields_three_tracks() {
        let snapshot = parse_award_page(AWARD_PAGE).unwrap();
        assert_eq!(snapshot.state.track(AwardCategory::Item).encode(), "101");
        assert_eq!(
            snapshot.state.track(AwardCategory::Publication).encode(),
            "0"
        );
        assert_eq!(snapshot.state.track(AwardCategory::Community).encode(), "1");
        assert_eq!(snapshot.count, 3);
    }

    #[test]
    fn award_page_without_sections_is_a_structure_error() {
        let err = parse_award_page("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, FetchError::Structure(_)));
    }

    #[test]
    fn award_page_with_two_sections_is_a_structure_error() {
        let html = r#"<div id="awards_section"><div></div><div></div></div>"#;
        assert!(matches!(
            parse_award_page(html).unwrap_err(),
            FetchError::Structure(_)
        ));
    }

    #[test]
    fn post_page_sums_per_post_credits() {
        let snapshot = parse_post_page(POST_PAGE).unwrap();
        assert_eq!(snapshot.post_count, 2);
        // 34 from the header is stale; 5 + 2 is the real total.
        assert_eq!(snapshot.total, 7);
        assert_eq!(snapshot.state.get(107), Some(5));
        assert_eq!(snapshot.state.get(108), Some(2));
    }

    #[test]
    fn post_page_with_no_posts_is_empty_but_valid() {
        let html = r#"
            <div id="posts_made_section">
                <h3>Posts made 0 / Kudos earned 0</h3>
            </div>"#;
        let snapshot = parse_post_page(html).unwrap();
        assert_eq!(snapshot.post_count, 0);
        assert_eq!(snapshot.total, 0);
        assert!(snapshot.state.is_empty());
    }

    #[test]
    fn post_page_without_header_is_a_structure_error() {
        let err = parse_post_page("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, FetchError::Structure(_)));
    }

    #[test]
    fn post_box_with_bad_numbers_is_a_structure_error() {
        let html = r#"
            <div id="posts_made_section">
                <h3>Posts made 1 / Kudos earned 1</h3>
                <div class="post_made_box"><span>107</span><span>soon</span></div>
            </div>"#;
        assert!(matches!(
            parse_post_page(html).unwrap_err(),
            FetchError::Structure(_)
        ));
    }
}
