use elasticsearch::{Elasticsearch, SearchParts};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::search_body::build_search_body;
use super::{Page, PageFetcher, Record};
use crate::config::QuerySettings;
use crate::error::{ExportError, Result};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct TotalHits {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    fields: HashMap<String, Vec<Value>>,
}

/// Page fetcher backed by the Elasticsearch `_search` API
#[derive(Clone)]
pub struct SearchFetcher {
    client: Elasticsearch,
    query: QuerySettings,
}

impl SearchFetcher {
    pub fn new(client: Elasticsearch, query: QuerySettings) -> Self {
        Self { client, query }
    }

    fn to_page(&self, index: &str, offset: u64, response: SearchResponse) -> Page {
        let hits = response.hits.hits;
        // Fall back to the page length when track_total_hits is disabled upstream
        let total_count = response
            .hits
            .total
            .map_or(hits.len() as u64, |total| total.value);

        let mut missing = 0usize;
        let records = hits
            .iter()
            .map(|hit| {
                let raw = hit
                    .fields
                    .get(&self.query.log_field)
                    .and_then(|values| values.first())
                    .and_then(Value::as_str);
                if raw.is_none() {
                    missing += 1;
                }
                Record::new(raw.unwrap_or_default())
            })
            .collect();

        if missing > 0 {
            warn!(
                "index: {}, offset: {}: {} hits had no '{}' field, exported as empty rows",
                index, offset, missing, self.query.log_field
            );
        }

        Page {
            records,
            total_count,
            offset,
        }
    }
}

impl PageFetcher for SearchFetcher {
    fn page_size(&self) -> u64 {
        self.query.page_size
    }

    async fn fetch(&self, index: &str, offset: u64) -> Result<Page> {
        debug!("index: {}, fetching page at offset {}", index, offset);
        let body = build_search_body(&self.query, offset);

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| ExportError::backend(index, format!("search request failed: {}", e)))?;

        let status = response.status_code();
        // 403 means the credentials were accepted but lack privileges on the
        // index, which is reported as a backend error below
        if status.as_u16() == 401 {
            return Err(ExportError::Auth {
                index: index.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExportError::backend(
                index,
                format!("HTTP {}: {}", status.as_u16(), text),
            ));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            ExportError::backend(index, format!("failed to parse search response: {}", e))
        })?;

        let page = self.to_page(index, offset, parsed);
        debug!(
            "index: {}, offset: {}, received {} records (total {})",
            index,
            offset,
            page.records.len(),
            page.total_count
        );
        Ok(page)
    }
}
