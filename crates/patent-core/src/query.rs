//! Structured queries consumed by a [`DocumentIndex`](crate::traits::DocumentIndex).
//!
//! The shapes here are backend neutral: the OpenSearch client renders them to
//! its JSON DSL, and test doubles can match on them directly.

use crate::types::{DateRange, DISPLAY_FIELDS};

pub const ABSTRACT_FIELD: &str = "abstract";
pub const EMBEDDING_FIELD: &str = "embedding";
pub const DATE_FIELD: &str = "publication_date";

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Lexical match of `text` against an analysed field.
    Match { field: String, text: String },
    /// k-nearest-neighbour search over a vector field.
    Knn { field: String, vector: Vec<f32>, k: usize },
    /// Logical OR; the index combines the clause scores.
    Should(Vec<Clause>),
}

impl Clause {
    pub fn match_abstract(text: &str) -> Self {
        Clause::Match { field: ABSTRACT_FIELD.to_string(), text: text.to_string() }
    }

    pub fn knn_embedding(vector: Vec<f32>, k: usize) -> Self {
        Clause::Knn { field: EMBEDDING_FIELD.to_string(), vector, k }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub clause: Clause,
    pub size: usize,
    pub date_range: Option<DateRange>,
    pub source_fields: Vec<String>,
}

impl SearchRequest {
    /// A request for `size` hits projecting the display fields.
    pub fn new(clause: Clause, size: usize) -> Self {
        Self {
            clause,
            size,
            date_range: None,
            source_fields: DISPLAY_FIELDS.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    pub fn with_date_range(mut self, range: Option<DateRange>) -> Self {
        self.date_range = range;
        self
    }

    /// Text of the lexical part of the query, if any.
    pub fn match_text(&self) -> Option<&str> {
        fn find(clause: &Clause) -> Option<&str> {
            match clause {
                Clause::Match { text, .. } => Some(text.as_str()),
                Clause::Knn { .. } => None,
                Clause::Should(clauses) => clauses.iter().find_map(find),
            }
        }
        find(&self.clause)
    }

    pub fn has_knn(&self) -> bool {
        fn any_knn(clause: &Clause) -> bool {
            match clause {
                Clause::Knn { .. } => true,
                Clause::Match { .. } => false,
                Clause::Should(clauses) => clauses.iter().any(any_knn),
            }
        }
        any_knn(&self.clause)
    }
}
