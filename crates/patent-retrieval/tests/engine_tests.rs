mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use common::*;
use patent_core::query::Clause;
use patent_core::types::DateRange;
use patent_embed::FakeEmbedder;
use patent_retrieval::{RetrievalEngine, RetrievalOptions, SearchMode};

fn engine<I: patent_core::traits::DocumentIndex>(index: I) -> RetrievalEngine<I> {
    RetrievalEngine::new(index, Box::new(FakeEmbedder::new(MEMORY_DIM)), RetrievalOptions::default())
}

#[test]
fn iterative_scenario_battery_two_rounds() {
    let a = hit("A", "A", "battery a", 3.0);
    let b = hit("B", "B", "battery b", 2.0);
    let c = hit("C", "C", "battery c", 1.0);
    let index = ScriptedIndex::new()
        .on("battery", vec![a.clone(), b, c])
        .on("battery A", vec![a]);
    let engine = engine(index);

    let outcome = engine.iterative_search_traced("battery", 2, 20);

    assert_eq!(titles(&outcome.hits), vec!["A", "B", "C"]);
    assert_eq!(outcome.rounds.len(), 2);
    assert_eq!(outcome.rounds[0].query, "battery");
    assert_eq!(outcome.rounds[1].query, "battery A");
    assert_eq!(outcome.rounds[1].added, 0);
}

#[test]
fn iterative_stops_on_first_empty_round() {
    let index = ScriptedIndex::new().on("battery", vec![hit("A", "anode", "battery", 1.0)]);
    let engine = engine(index);

    let outcome = engine.iterative_search_traced("battery", 5, 20);

    assert_eq!(outcome.hits.len(), 1);
    assert_eq!(outcome.rounds.len(), 2, "second round ran and came back empty");
    assert_eq!(outcome.rounds[1].returned, 0);
}

#[test]
fn iterative_keeps_partial_results_when_a_round_fails() {
    let index = ScriptedIndex::new()
        .on("battery", vec![hit("A", "anode", "battery", 1.0), hit("B", "cathode", "battery", 0.5)])
        .failing_on("battery anode");
    let engine = engine(index);

    let hits = engine.iterative_search("battery", 3, 20);

    assert_eq!(titles(&hits), vec!["anode", "cathode"]);
}

#[test]
fn iterative_dedups_by_patent_id_even_when_scores_differ() {
    let index = ScriptedIndex::new()
        .on("cell", vec![hit("US1", "Separator", "cell", 5.0)])
        .on("cell Separator", vec![hit("US1", "Separator", "cell", 9.5), hit("US2", "Binder", "cell", 1.0)]);
    let engine = engine(index);

    let hits = engine.iterative_search("cell", 2, 20);

    assert_eq!(titles(&hits), vec!["Separator", "Binder"]);
    assert_eq!(hits[0].score, Some(5.0), "first occurrence wins");
}

#[test]
fn iterative_with_zero_steps_issues_no_queries() {
    let index = Arc::new(ScriptedIndex::new().on("x", vec![hit("A", "A", "x", 1.0)]));
    let engine = engine(index.clone());

    assert!(engine.iterative_search("x", 0, 20).is_empty());
    assert_eq!(index.request_count(), 0);
}

#[test]
fn iterative_stops_when_refinement_would_exceed_cap() {
    let index = Arc::new(
        ScriptedIndex::new()
            .on("battery", vec![hit("A", "a very long title about electrolytes", "battery", 1.0)]),
    );
    let options = RetrievalOptions { max_query_chars: 16, ..RetrievalOptions::default() };
    let engine = RetrievalEngine::new(index.clone(), Box::new(FakeEmbedder::new(8)), options);

    let outcome = engine.iterative_search_traced("battery", 3, 20);

    assert_eq!(outcome.rounds.len(), 1);
    assert_eq!(index.match_texts(), vec!["battery"]);
}

#[test]
fn semantic_search_with_failing_embedder_is_empty() {
    let index = Arc::new(ScriptedIndex::new().on_knn(vec![hit("A", "A", "x", 1.0)]));
    let embedder = FailingEmbedder::new();
    let engine = RetrievalEngine::new(index.clone(), Box::new(embedder), RetrievalOptions::default());

    let hits = engine.semantic_search("x", 20);

    assert!(hits.is_empty());
    assert_eq!(index.request_count(), 0, "no index call without a vector");
}

#[test]
fn hybrid_falls_back_to_keyword_when_embedding_fails() {
    let corpus = Arc::new(MemoryIndex::battery_corpus());
    let failing = RetrievalEngine::new(corpus.clone(), Box::new(FailingEmbedder::new()), RetrievalOptions::default());
    let healthy = engine(corpus);

    let hybrid = failing.hybrid_search("lithium battery", 3);
    let keyword = healthy.keyword_search("lithium battery", 3);

    assert!(!keyword.is_empty());
    assert_eq!(hybrid, keyword);
}

#[test]
fn hybrid_falls_back_to_keyword_when_index_rejects_knn() {
    let corpus = MemoryIndex::battery_corpus();
    let engine = engine(NoKnnIndex(corpus));

    let hybrid = engine.hybrid_search("cathode coating", 5);

    assert_eq!(titles(&hybrid)[0], "Cathode coating");
    assert!(hybrid.iter().all(|h| h.source.abstract_text.contains("cathode") || h.source.abstract_text.contains("coating")));
}

#[test]
fn hybrid_sends_should_of_knn_and_match() {
    let index = Arc::new(ScriptedIndex::new().on("anode", vec![hit("A", "A", "anode", 1.0)]));
    let engine = engine(index.clone());

    engine.hybrid_search("anode", 4);

    let requests = index.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    match &requests[0].clause {
        Clause::Should(clauses) => {
            assert!(matches!(&clauses[0], Clause::Knn { k: 4, field, .. } if field == "embedding"));
            assert!(matches!(&clauses[1], Clause::Match { text, field } if text == "anode" && field == "abstract"));
        }
        other => panic!("expected should clause, got {other:?}"),
    }
    assert_eq!(requests[0].size, 4);
}

#[test]
fn everything_degrades_when_index_is_down() {
    let index = Arc::new(DownIndex::default());
    let engine = engine(index.clone());

    assert!(engine.keyword_search("battery", 20).is_empty());
    assert!(engine.semantic_search("battery", 20).is_empty());
    assert!(engine.hybrid_search("battery", 20).is_empty());
    assert!(engine.iterative_search("battery", 3, 20).is_empty());
    // hybrid tries twice (hybrid then keyword), iterative stops after one round
    assert_eq!(index.calls.load(Ordering::SeqCst), 5);
}

#[test]
fn keyword_never_returns_more_than_top_k() {
    let many: Vec<_> = (0..10).map(|i| hit(&format!("US{i}"), "t", "battery", 1.0)).collect();
    let engine = engine(ScriptedIndex::new().on("battery", many));

    assert_eq!(engine.keyword_search("battery", 3).len(), 3);
    assert!(engine.keyword_search("battery", 0).is_empty());
}

#[test]
fn semantic_search_ranks_related_patents_first() {
    let corpus = MemoryIndex::battery_corpus();
    let embedder = corpus.embedder();
    let engine = RetrievalEngine::new(corpus, Box::new(embedder), RetrievalOptions::default());

    let hits = engine.semantic_search("Irrigation valve valve for agricultural irrigation systems", 2);

    assert_eq!(hits[0].source.patent_id, "US5");
}

#[test]
fn date_range_option_filters_results() {
    let range = DateRange::new(NaiveDate::from_ymd_opt(2019, 1, 1), None);
    let options = RetrievalOptions { date_range: range, ..RetrievalOptions::default() };
    let engine = RetrievalEngine::new(MemoryIndex::battery_corpus(), Box::new(FakeEmbedder::new(MEMORY_DIM)), options);

    let hits = engine.keyword_search("battery lithium cells", 20);

    let ids: Vec<&str> = hits.iter().map(|h| h.source.patent_id.as_str()).collect();
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| ["US3", "US4", "US6"].contains(id)), "got {ids:?}");
}

#[test]
fn search_dispatches_on_mode() {
    let corpus = Arc::new(MemoryIndex::battery_corpus());
    let engine = engine(corpus);
    assert_eq!(engine.search(SearchMode::Keyword, "anode", 5), engine.keyword_search("anode", 5));
    assert_eq!(engine.search(SearchMode::Semantic, "anode", 5), engine.semantic_search("anode", 5));
    assert_eq!(engine.search(SearchMode::Hybrid, "anode", 5), engine.hybrid_search("anode", 5));
}

#[test]
fn default_helpers_use_configured_options() {
    let index = Arc::new(
        ScriptedIndex::new()
            .on("battery", (0..6).map(|i| hit(&format!("US{i}"), "Cell", "battery", 1.0)).collect())
            .on("battery Cell", vec![hit("US9", "Pack", "battery", 1.0)]),
    );
    let options = RetrievalOptions { top_k: 4, refinement_steps: 2, ..RetrievalOptions::default() };
    let engine = RetrievalEngine::new(index.clone(), Box::new(FakeEmbedder::new(8)), options);

    assert_eq!(engine.keyword("battery").len(), 4);
    assert_eq!(engine.hybrid("battery").len(), 4);
    assert_eq!(engine.iterative("battery").len(), 5);
    assert!(index.requests.lock().unwrap().iter().all(|r| r.size == 4));
    assert!(engine.semantic("battery").len() <= 4);
}
