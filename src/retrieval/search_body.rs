use serde_json::{Map, Value, json};

use crate::config::QuerySettings;

/// Build the search body for one page.
///
/// `from` is left out entirely at offset 0; the backend treats a missing
/// `from` and `from: 0` the same way.
pub fn build_search_body(query: &QuerySettings, offset: u64) -> Value {
    let mut match_clause = Map::new();
    match_clause.insert(query.match_field.clone(), json!(query.keyword));

    let mut sort_clause = Map::new();
    sort_clause.insert(query.sort_field.clone(), json!({ "order": "asc" }));

    let mut body = Map::new();
    if offset > 0 {
        body.insert("from".to_string(), json!(offset));
    }
    body.insert("size".to_string(), json!(query.page_size));
    body.insert("query".to_string(), json!({ "match": match_clause }));
    body.insert("fields".to_string(), json!([query.log_field]));
    body.insert("sort".to_string(), json!([sort_clause]));
    body.insert("_source".to_string(), json!(false));

    log::debug!(
        "Search body: {}",
        serde_json::to_string(&body).unwrap_or_default()
    );
    Value::Object(body)
}
