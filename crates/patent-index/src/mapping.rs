use serde_json::{json, Value};

use patent_core::types::PatentRecord;

/// Index settings + mappings for the patent corpus with a k-NN vector field.
pub fn patent_index_body(dimension: usize) -> Value {
    json!({
        "settings": {
            "index": { "knn": true }
        },
        "mappings": {
            "properties": {
                "title": { "type": "text" },
                "abstract": { "type": "text" },
                "publication_date": { "type": "date", "format": "yyyy-MM-dd" },
                "patent_id": { "type": "keyword" },
                "token_count": { "type": "integer" },
                "embedding": {
                    "type": "knn_vector",
                    "dimension": dimension,
                    "method": {
                        "name": "hnsw",
                        "space_type": "cosinesimil",
                        "engine": "nmslib"
                    }
                }
            }
        }
    })
}

/// NDJSON body for `_bulk`, one action/document pair per record keyed by
/// `patent_id` so re-ingesting a record overwrites it.
pub fn bulk_body(index: &str, records: &[PatentRecord]) -> serde_json::Result<String> {
    let mut body = String::new();
    for r in records {
        body.push_str(&serde_json::to_string(&json!({ "index": { "_index": index, "_id": r.patent_id } }))?);
        body.push('\n');
        body.push_str(&serde_json::to_string(r)?);
        body.push('\n');
    }
    Ok(body)
}
