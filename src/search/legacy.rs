// Legacy search encoding
// Filters stored as a URL query string, e.g.
// `includedTags=cat&categories=anime%2Cgeneral&purity=sfw&sorting=toplist&topRange=1d`

use std::collections::BTreeSet;

use url::form_urlencoded;

use super::filters::{
    Category, FilterSet, Order, Purity, Ratio, Resolution, SearchSpec, Sorting, TopRange,
};

/// Sorting assumed when a legacy blob carries no `sorting` key
pub const LEGACY_DEFAULT_SORTING: Sorting = Sorting::Toplist;

/// Top range assumed when a legacy blob carries no `topRange` key
pub const LEGACY_DEFAULT_TOP_RANGE: TopRange = TopRange::OneDay;

/// Fields read from a legacy blob
///
/// `None` and empty sets mean the key was missing or had an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyFilters {
    pub included_tags: BTreeSet<String>,
    pub excluded_tags: BTreeSet<String>,
    pub username: Option<String>,
    pub tag_id: Option<i64>,
    pub wallpaper_id: Option<String>,
    pub categories: Option<BTreeSet<Category>>,
    pub purity: Option<BTreeSet<Purity>>,
    pub sorting: Option<Sorting>,
    pub order: Option<Order>,
    pub top_range: Option<TopRange>,
    pub atleast: Option<Resolution>,
    pub resolutions: BTreeSet<Resolution>,
    pub ratios: BTreeSet<Ratio>,
    pub colors: BTreeSet<String>,
    pub seed: Option<String>,
    /// Number of malformed pairs that were dropped
    pub skipped_pairs: usize,
}

impl LegacyFilters {
    /// Resolve absent fields, applying the legacy implicit sort defaults
    pub fn into_filter_set(self) -> FilterSet {
        let defaults = FilterSet::default();
        FilterSet {
            included_tags: self.included_tags,
            excluded_tags: self.excluded_tags,
            username: self.username,
            tag_id: self.tag_id,
            wallpaper_id: self.wallpaper_id,
            categories: self.categories.unwrap_or(defaults.categories),
            purity: self.purity.unwrap_or(defaults.purity),
            sorting: self.sorting.unwrap_or(LEGACY_DEFAULT_SORTING),
            order: self.order.unwrap_or(defaults.order),
            top_range: self.top_range.unwrap_or(LEGACY_DEFAULT_TOP_RANGE),
            atleast: self.atleast,
            resolutions: self.resolutions,
            ratios: self.ratios,
            colors: self.colors,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyDecode {
    Parsed(LegacyFilters),
    /// No pair in the blob carried a known key
    Unparseable,
}

/// Parse a legacy query string, skipping malformed pairs
pub fn decode(blob: &str) -> LegacyDecode {
    let mut filters = LegacyFilters::default();
    let mut recognised = false;

    for segment in blob.split('&') {
        if segment.is_empty() {
            continue;
        }
        if !segment.contains('=') {
            log::debug!("Skipping legacy pair without '=': {:?}", segment);
            filters.skipped_pairs += 1;
            continue;
        }

        let Some((key, value)) = form_urlencoded::parse(segment.as_bytes()).next() else {
            continue;
        };

        match apply_pair(&mut filters, &key, &value) {
            Ok(true) => recognised = true,
            Ok(false) => log::debug!("Ignoring unknown legacy key: {}", key),
            Err(reason) => {
                recognised = true;
                filters.skipped_pairs += 1;
                log::debug!("Skipping legacy pair {}={:?}: {}", key, value, reason);
            }
        }
    }

    if recognised {
        LegacyDecode::Parsed(filters)
    } else {
        LegacyDecode::Unparseable
    }
}

/// Decode a legacy blob into a full search
///
/// A blob that is not a legacy query string at all is kept as the free-text
/// query with default filters.
pub fn decode_legacy(blob: &str) -> SearchSpec {
    match decode(blob) {
        LegacyDecode::Parsed(filters) => SearchSpec::new("", filters.into_filter_set()),
        LegacyDecode::Unparseable => {
            log::warn!("Unparseable legacy search blob, keeping it as query text");
            SearchSpec::new(blob, FilterSet::default())
        }
    }
}

/// Encode filters in the legacy format, every key present in fixed order
pub fn encode_legacy(filters: &FilterSet) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());

    out.append_pair("includedTags", &join_sorted(filters.included_tags.iter().cloned()));
    out.append_pair("excludedTags", &join_sorted(filters.excluded_tags.iter().cloned()));
    out.append_pair("username", filters.username.as_deref().unwrap_or(""));
    out.append_pair("tagId", &filters.tag_id.map(|id| id.to_string()).unwrap_or_default());
    out.append_pair("wallpaperId", filters.wallpaper_id.as_deref().unwrap_or(""));
    out.append_pair(
        "categories",
        &join_sorted(filters.categories.iter().map(|c| c.legacy_token().to_string())),
    );
    out.append_pair(
        "purity",
        &join_sorted(filters.purity.iter().map(|p| p.legacy_token().to_string())),
    );
    out.append_pair("sorting", filters.sorting.legacy_token());
    out.append_pair("order", filters.order.legacy_token());
    out.append_pair("topRange", filters.top_range.legacy_token());
    out.append_pair(
        "atleast",
        &filters.atleast.map(|r| r.to_string()).unwrap_or_default(),
    );
    out.append_pair("resolutions", &join_sorted(filters.resolutions.iter().map(|r| r.to_string())));
    out.append_pair("ratios", &join_sorted(filters.ratios.iter().map(|r| r.to_string())));
    out.append_pair("colors", &join_sorted(filters.colors.iter().cloned()));
    out.append_pair("seed", filters.seed.as_deref().unwrap_or(""));

    out.finish()
}

/// Returns `Ok(false)` for keys the legacy format never had
fn apply_pair(filters: &mut LegacyFilters, key: &str, value: &str) -> Result<bool, String> {
    match key {
        "includedTags" => filters.included_tags = split_values(value).map(String::from).collect(),
        "excludedTags" => filters.excluded_tags = split_values(value).map(String::from).collect(),
        "username" => filters.username = non_empty(value),
        "tagId" => {
            filters.tag_id = match non_empty(value) {
                Some(v) => Some(v.parse().map_err(|_| format!("tag id is not a number: {}", v))?),
                None => None,
            }
        }
        "wallpaperId" => filters.wallpaper_id = non_empty(value),
        "categories" => filters.categories = parse_tokens(value, Category::from_legacy_token)?,
        "purity" => filters.purity = parse_tokens(value, Purity::from_legacy_token)?,
        "sorting" => filters.sorting = parse_token(value, Sorting::from_legacy_token)?,
        "order" => filters.order = parse_token(value, Order::from_legacy_token)?,
        "topRange" => filters.top_range = parse_token(value, TopRange::from_legacy_token)?,
        "atleast" => {
            filters.atleast = match non_empty(value) {
                Some(v) => Some(v.parse()?),
                None => None,
            }
        }
        "resolutions" => filters.resolutions = parse_values(value)?,
        "ratios" => filters.ratios = parse_values(value)?,
        "colors" => filters.colors = split_values(value).map(String::from).collect(),
        "seed" => filters.seed = non_empty(value),
        _ => return Ok(false),
    }
    Ok(true)
}

// Free-text values (tags, colors) are kept byte for byte
fn split_values(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').filter(|v| !v.is_empty())
}

fn split_tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|v| !v.is_empty())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_token<T>(value: &str, lookup: fn(&str) -> Option<T>) -> Result<Option<T>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    lookup(value)
        .map(Some)
        .ok_or_else(|| format!("unknown token {:?}", value))
}

fn parse_tokens<T: Ord>(
    value: &str,
    lookup: fn(&str) -> Option<T>,
) -> Result<Option<BTreeSet<T>>, String> {
    let tokens = split_tokens(value)
        .map(|token| lookup(token).ok_or_else(|| format!("unknown token {:?}", token)))
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(if tokens.is_empty() { None } else { Some(tokens) })
}

fn parse_values<T>(value: &str) -> Result<BTreeSet<T>, String>
where
    T: Ord + std::str::FromStr<Err = String>,
{
    split_tokens(value).map(|v| v.parse::<T>()).collect()
}

fn join_sorted(values: impl Iterator<Item = String>) -> String {
    let mut values: Vec<String> = values.collect();
    values.sort();
    values.join(",")
}
