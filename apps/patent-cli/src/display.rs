use std::fmt::Write;

use patent_core::types::PatentHit;
use patent_retrieval::format::truncate_chars;
use patent_retrieval::RoundSummary;

pub const RULE: &str = "------------------------------------------------------------";

const ABSTRACT_PREVIEW_CHARS: usize = 150;

/// Console listing of hits. Iterative results pass `show_score = false`
/// since scores from different rounds are not comparable.
pub fn render_hits(hits: &[PatentHit], show_score: bool) -> String {
    let mut out = format!("\nFound {} results:\n{RULE}\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        let s = &hit.source;
        let title = if s.title.is_empty() { "No Title" } else { s.title.as_str() };
        let _ = writeln!(out, "{}. {title}", i + 1);
        if show_score {
            match hit.score {
                Some(score) => { let _ = writeln!(out, "   Score: {score:.4}"); }
                None => { let _ = writeln!(out, "   Score: N/A"); }
            }
        }
        let _ = writeln!(out, "   Date: {}", s.publication_date.as_deref().unwrap_or("N/A"));
        let _ = writeln!(out, "   Patent ID: {}", if s.patent_id.is_empty() { "N/A" } else { s.patent_id.as_str() });
        let _ = writeln!(out, "   Abstract: {}...", truncate_chars(&s.abstract_text, ABSTRACT_PREVIEW_CHARS));
        let _ = writeln!(out, "{RULE}");
    }
    out
}

pub fn render_rounds(rounds: &[RoundSummary]) -> String {
    let mut out = String::new();
    for (i, r) in rounds.iter().enumerate() {
        let _ = writeln!(out, "Round {}: \"{}\" -> {} hits, {} new ({} total)", i + 1, r.query, r.returned, r.added, r.accumulated);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use patent_core::types::PatentSource;

    fn sample() -> PatentHit {
        PatentHit {
            doc_id: Some("US1".into()),
            score: Some(2.5),
            source: PatentSource {
                title: "Solid electrolyte".into(),
                abstract_text: "a".repeat(400),
                publication_date: Some("2020-02-02".into()),
                patent_id: "US1".into(),
            },
        }
    }

    #[test]
    fn listing_truncates_abstract_and_shows_score() {
        let text = render_hits(&[sample()], true);
        assert!(text.contains("Found 1 results:"));
        assert!(text.contains("1. Solid electrolyte\n   Score: 2.5000\n   Date: 2020-02-02\n   Patent ID: US1\n"));
        assert!(text.contains(&format!("   Abstract: {}...\n", "a".repeat(150))));
        assert!(!text.contains(&"a".repeat(151)));
    }

    #[test]
    fn iterative_listing_omits_score_and_fills_blanks() {
        let text = render_hits(&[sample(), PatentHit::default()], false);
        assert!(!text.contains("Score"));
        assert!(text.contains("2. No Title\n   Date: N/A\n   Patent ID: N/A\n"));
    }

    #[test]
    fn rounds_are_numbered() {
        let rounds = vec![RoundSummary { query: "battery".into(), returned: 3, added: 3, accumulated: 3 }];
        assert_eq!(render_rounds(&rounds), "Round 1: \"battery\" -> 3 hits, 3 new (3 total)\n");
    }
}
