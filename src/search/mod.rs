// Search model and its persisted encodings
//
// - filters.rs: SearchSpec, the per-source filters and the frozen enum vocabulary
// - legacy.rs: URL query string encoding (schema v1-v3)
// - document.rs: JSON document encoding (schema v4+)
// - api.rs: request paths and parameters per source
//
// Every codec here is a pure function and safe to call from any thread.

pub mod api;
pub mod document;
pub mod filters;
pub mod legacy;

pub use document::{decode_filters, decode_spec, encode_filters, encode_spec};
pub use filters::{
    Category, FilterSet, Order, Purity, Ratio, RedditFilters, RedditSort, RedditTimeRange,
    Resolution, SearchFilters, SearchSpec, Sorting, Source, TopRange,
};
pub use legacy::{decode_legacy, encode_legacy};
