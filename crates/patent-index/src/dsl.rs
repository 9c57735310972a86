use serde_json::{json, Map, Value};

use patent_core::query::{Clause, SearchRequest, DATE_FIELD};
use patent_core::types::DateRange;

/// Render a request to the OpenSearch `_search` body.
pub fn render(request: &SearchRequest) -> Value {
    let clause = render_clause(&request.clause);
    let query = match &request.date_range {
        Some(range) => json!({ "bool": { "must": [clause], "filter": [render_range(range)] } }),
        None => clause,
    };
    json!({
        "size": request.size,
        "query": query,
        "_source": request.source_fields,
    })
}

pub fn render_clause(clause: &Clause) -> Value {
    match clause {
        Clause::Match { field, text } => {
            let mut inner = Map::new();
            inner.insert(field.clone(), Value::String(text.clone()));
            json!({ "match": inner })
        }
        Clause::Knn { field, vector, k } => {
            let mut inner = Map::new();
            inner.insert(field.clone(), json!({ "vector": vector, "k": k }));
            json!({ "knn": inner })
        }
        Clause::Should(clauses) => {
            let should: Vec<Value> = clauses.iter().map(render_clause).collect();
            json!({ "bool": { "should": should } })
        }
    }
}

fn render_range(range: &DateRange) -> Value {
    let mut bounds = Map::new();
    if let Some(from) = range.from {
        bounds.insert("gte".into(), Value::String(from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = range.to {
        bounds.insert("lte".into(), Value::String(to.format("%Y-%m-%d").to_string()));
    }
    let mut field = Map::new();
    field.insert(DATE_FIELD.to_string(), Value::Object(bounds));
    json!({ "range": field })
}
