// Search request builders
// Maps a SearchSpec onto the request of its source:
// Wallhaven `GET /api/v1/search`, Reddit `GET /r/{subreddits}/search.json`

use url::form_urlencoded;

use super::filters::{
    Category, FilterSet, Purity, RedditFilters, SearchFilters, SearchSpec, Sorting,
};

/// Request path relative to the source's base URL
pub fn request_path(spec: &SearchSpec) -> String {
    match &spec.filters {
        SearchFilters::Wallhaven(_) => "api/v1/search".to_string(),
        SearchFilters::Reddit(filters) if filters.subreddits.is_empty() => "search.json".to_string(),
        SearchFilters::Reddit(filters) => format!("r/{}/search.json", join_with(filters.subreddits.iter(), "+")),
    }
}

/// Build the `q` parameter: free text plus Wallhaven's tag/user operators
pub fn search_term(spec: &SearchSpec) -> String {
    let query = spec.query.trim();
    let filters = match &spec.filters {
        SearchFilters::Wallhaven(filters) => filters,
        SearchFilters::Reddit(_) => return query.to_string(),
    };

    let mut parts: Vec<String> = Vec::new();
    if !query.is_empty() {
        parts.push(query.to_string());
    }
    parts.extend(filters.included_tags.iter().map(|tag| format!("+{}", tag)));
    parts.extend(filters.excluded_tags.iter().map(|tag| format!("-{}", tag)));
    if let Some(ref username) = filters.username {
        parts.push(format!("@{}", username));
    }
    if let Some(tag_id) = filters.tag_id {
        parts.push(format!("id:{}", tag_id));
    }
    if let Some(ref wallpaper_id) = filters.wallpaper_id {
        parts.push(format!("like:{}", wallpaper_id));
    }

    parts.join(" ")
}

/// Request parameters for one result page, in a stable order
///
/// Reddit pages by an `after` cursor instead of a number, so `page` only
/// applies to Wallhaven.
pub fn request_params(spec: &SearchSpec, page: u32) -> Vec<(&'static str, String)> {
    let q = search_term(spec);
    match &spec.filters {
        SearchFilters::Wallhaven(filters) => wallhaven_params(q, filters, page),
        SearchFilters::Reddit(filters) => reddit_params(q, filters),
    }
}

fn wallhaven_params(q: String, filters: &FilterSet, page: u32) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if !q.is_empty() {
        params.push(("q", q));
    }
    params.push((
        "categories",
        bit_string(&[Category::General, Category::Anime, Category::People], |c| {
            filters.categories.contains(c)
        }),
    ));
    params.push((
        "purity",
        bit_string(&[Purity::Sfw, Purity::Sketchy, Purity::Nsfw], |p| {
            filters.purity.contains(p)
        }),
    ));
    params.push(("sorting", filters.sorting.legacy_token().to_string()));
    params.push(("order", filters.order.legacy_token().to_string()));
    if filters.sorting == Sorting::Toplist {
        params.push(("topRange", filters.top_range.legacy_token().to_string()));
    }
    if let Some(atleast) = filters.atleast {
        params.push(("atleast", atleast.to_string()));
    }
    if !filters.resolutions.is_empty() {
        params.push(("resolutions", join(filters.resolutions.iter())));
    }
    if !filters.ratios.is_empty() {
        params.push(("ratios", join(filters.ratios.iter())));
    }
    if !filters.colors.is_empty() {
        params.push(("colors", join(filters.colors.iter())));
    }
    if filters.sorting == Sorting::Random {
        if let Some(ref seed) = filters.seed {
            params.push(("seed", seed.clone()));
        }
    }
    if page > 1 {
        params.push(("page", page.to_string()));
    }

    params
}

fn reddit_params(q: String, filters: &RedditFilters) -> Vec<(&'static str, String)> {
    let mut params = vec![("q", q)];
    if !filters.subreddits.is_empty() {
        params.push(("restrict_sr", "1".to_string()));
    }
    params.push(("sort", filters.sort.legacy_token().to_string()));
    params.push(("t", filters.time_range.legacy_token().to_string()));
    if filters.include_nsfw {
        params.push(("include_over_18", "on".to_string()));
    }
    params
}

/// `request_params` serialized as a URL query string
pub fn request_query_string(spec: &SearchSpec, page: u32) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(request_params(spec, page))
        .finish()
}

// Wallhaven's fixed-position flags, e.g. general+people => "101"
fn bit_string<T>(order: &[T], enabled: impl Fn(&T) -> bool) -> String {
    order.iter().map(|v| if enabled(v) { '1' } else { '0' }).collect()
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    join_with(values, ",")
}

fn join_with<T: ToString>(values: impl Iterator<Item = T>, separator: &str) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(separator)
}
