// Current search encoding
// JSON documents with stable field names, only non-default fields emitted:
// `{"query":"sky","filters":{"includedTags":["test"],"sorting":"TOPLIST"}}`
// `{"filters":{"source":"REDDIT","subreddits":["wallpapers"]}}`

use super::filters::{SearchFilters, SearchSpec};

/// Encode filters alone, as stored in the `filters` column
pub fn encode_filters(filters: &SearchFilters) -> String {
    // Plain data with string keys; serde_json cannot fail on it.
    serde_json::to_string(filters).unwrap_or_default()
}

/// Encode a full search, as stored in `search_query.query_string`
pub fn encode_spec(spec: &SearchSpec) -> String {
    serde_json::to_string(spec).unwrap_or_default()
}

/// Decode a filters document, `None` when it is not one
pub fn decode_filters(text: &str) -> Option<SearchFilters> {
    match serde_json::from_str(text) {
        Ok(filters) => Some(filters),
        Err(e) => {
            log::warn!("Failed to decode filters document: {}", e);
            None
        }
    }
}

/// Decode a search document
///
/// Text that is not a search document becomes the free-text query with
/// default Wallhaven filters.
pub fn decode_spec(text: &str) -> SearchSpec {
    match serde_json::from_str(text) {
        Ok(spec) => spec,
        Err(e) => {
            log::warn!("Failed to decode search document, keeping it as query text: {}", e);
            SearchSpec::new(text, SearchFilters::default())
        }
    }
}
