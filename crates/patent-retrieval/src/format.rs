use patent_core::types::PatentHit;

/// Abstract characters kept per hit in the LLM listing.
const LLM_ABSTRACT_CHARS: usize = 200;

/// Numbered plain-text listing of hits, the shape handed to report stages.
pub fn format_hits_for_llm(hits: &[PatentHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let s = &hit.source;
            format!(
                "{}. Title: {}\n   Date: {}\n   Patent ID: {}\n   Abstract: {}...\n",
                i + 1,
                or_na(&s.title),
                s.publication_date.as_deref().map_or("N/A", or_na),
                or_na(&s.patent_id),
                truncate_chars(&s.abstract_text, LLM_ABSTRACT_CHARS),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First `n` characters of `s`, never splitting a UTF-8 sequence.
pub fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn or_na(s: &str) -> &str {
    if s.trim().is_empty() { "N/A" } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patent_core::types::PatentSource;

    #[test]
    fn listing_numbers_hits_and_fills_missing_fields() {
        let hits = vec![
            PatentHit { source: PatentSource { title: "Cell".into(), abstract_text: "x".repeat(300), publication_date: Some("2020-01-01".into()), patent_id: "US1".into() }, ..PatentHit::default() },
            PatentHit::default(),
        ];
        let text = format_hits_for_llm(&hits);
        assert!(text.starts_with("1. Title: Cell\n   Date: 2020-01-01\n   Patent ID: US1\n"));
        assert!(text.contains(&format!("Abstract: {}...", "x".repeat(200))));
        assert!(!text.contains(&"x".repeat(201)));
        assert!(text.contains("2. Title: N/A\n   Date: N/A\n   Patent ID: N/A"));
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
