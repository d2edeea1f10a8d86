// Search model - the typed search a user runs against an online source
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

token_enum! {
    /// Where a search is run
    pub enum Source {
        Wallhaven => ("wallhaven", "WALLHAVEN"),
        Reddit => ("reddit", "REDDIT"),
    }
}

token_enum! {
    /// Wallhaven content category
    pub enum Category {
        General => ("general", "GENERAL"),
        Anime => ("anime", "ANIME"),
        People => ("people", "PEOPLE"),
    }
}

token_enum! {
    /// Wallhaven purity level
    pub enum Purity {
        Sfw => ("sfw", "SFW"),
        Sketchy => ("sketchy", "SKETCHY"),
        Nsfw => ("nsfw", "NSFW"),
    }
}

token_enum! {
    pub enum Sorting {
        DateAdded => ("date_added", "DATE_ADDED"),
        Relevance => ("relevance", "RELEVANCE"),
        Random => ("random", "RANDOM"),
        Views => ("views", "VIEWS"),
        Favorites => ("favorites", "FAVORITES"),
        Toplist => ("toplist", "TOPLIST"),
    }
}

token_enum! {
    pub enum Order {
        Desc => ("desc", "DESC"),
        Asc => ("asc", "ASC"),
    }
}

token_enum! {
    /// Time window for the toplist sorting
    pub enum TopRange {
        OneDay => ("1d", "ONE_DAY"),
        ThreeDays => ("3d", "THREE_DAYS"),
        OneWeek => ("1w", "ONE_WEEK"),
        OneMonth => ("1M", "ONE_MONTH"),
        ThreeMonths => ("3M", "THREE_MONTHS"),
        SixMonths => ("6M", "SIX_MONTHS"),
        OneYear => ("1y", "ONE_YEAR"),
    }
}

/// A `WIDTHxHEIGHT` pair, used for resolutions and size ratios
///
/// Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Result<Self, String> {
        if width == 0 || height == 0 {
            return Err(format!("Resolution must be non-zero: {}x{}", width, height));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("Invalid resolution: {}", s))?;
        let width: u32 = w.parse().map_err(|_| format!("Invalid resolution width: {}", s))?;
        let height: u32 = h.parse().map_err(|_| format!("Invalid resolution height: {}", s))?;
        Self::new(width, height)
    }
}

/// Aspect ratio filter: either an orientation or an exact `WxH` ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ratio {
    Landscape,
    Portrait,
    Size(Resolution),
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Landscape => f.write_str("landscape"),
            Ratio::Portrait => f.write_str("portrait"),
            Ratio::Size(size) => write!(f, "{}", size),
        }
    }
}

impl FromStr for Ratio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "landscape" => Ok(Ratio::Landscape),
            "portrait" => Ok(Ratio::Portrait),
            other => other
                .parse::<Resolution>()
                .map(Ratio::Size)
                .map_err(|_| format!("Invalid ratio: {}", s)),
        }
    }
}

// Both pair types persist as their display text in every format.
macro_rules! display_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(D::Error::custom)
            }
        }
    };
}

display_serde!(Resolution);
display_serde!(Ratio);

/// Typed Wallhaven filters
///
/// Field names and order define the current document format; fields equal
/// to their default are not emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSet {
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub included_tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub excluded_tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallpaper_id: Option<String>,
    #[serde(skip_serializing_if = "is_default_categories")]
    pub categories: BTreeSet<Category>,
    #[serde(skip_serializing_if = "is_default_purity")]
    pub purity: BTreeSet<Purity>,
    #[serde(skip_serializing_if = "is_default_sorting")]
    pub sorting: Sorting,
    #[serde(skip_serializing_if = "is_default_order")]
    pub order: Order,
    #[serde(skip_serializing_if = "is_default_top_range")]
    pub top_range: TopRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atleast: Option<Resolution>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub resolutions: BTreeSet<Resolution>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub ratios: BTreeSet<Ratio>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub colors: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

pub const DEFAULT_CATEGORIES: [Category; 3] = [Category::General, Category::Anime, Category::People];
pub const DEFAULT_PURITY: [Purity; 1] = [Purity::Sfw];
pub const DEFAULT_SORTING: Sorting = Sorting::DateAdded;
pub const DEFAULT_ORDER: Order = Order::Desc;
pub const DEFAULT_TOP_RANGE: TopRange = TopRange::OneMonth;

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            included_tags: BTreeSet::new(),
            excluded_tags: BTreeSet::new(),
            username: None,
            tag_id: None,
            wallpaper_id: None,
            categories: DEFAULT_CATEGORIES.into_iter().collect(),
            purity: DEFAULT_PURITY.into_iter().collect(),
            sorting: DEFAULT_SORTING,
            order: DEFAULT_ORDER,
            top_range: DEFAULT_TOP_RANGE,
            atleast: None,
            resolutions: BTreeSet::new(),
            ratios: BTreeSet::new(),
            colors: BTreeSet::new(),
            seed: None,
        }
    }
}

fn is_default_categories(categories: &BTreeSet<Category>) -> bool {
    categories.len() == DEFAULT_CATEGORIES.len()
        && DEFAULT_CATEGORIES.iter().all(|c| categories.contains(c))
}

fn is_default_purity(purity: &BTreeSet<Purity>) -> bool {
    purity.len() == DEFAULT_PURITY.len() && DEFAULT_PURITY.iter().all(|p| purity.contains(p))
}

fn is_default_sorting(sorting: &Sorting) -> bool {
    *sorting == DEFAULT_SORTING
}

fn is_default_order(order: &Order) -> bool {
    *order == DEFAULT_ORDER
}

fn is_default_top_range(top_range: &TopRange) -> bool {
    *top_range == DEFAULT_TOP_RANGE
}

token_enum! {
    pub enum RedditSort {
        Relevance => ("relevance", "RELEVANCE"),
        Hot => ("hot", "HOT"),
        Top => ("top", "TOP"),
        New => ("new", "NEW"),
        Comments => ("comments", "COMMENTS"),
    }
}

token_enum! {
    /// Time window for Reddit's `t` parameter
    pub enum RedditTimeRange {
        Hour => ("hour", "HOUR"),
        Day => ("day", "DAY"),
        Week => ("week", "WEEK"),
        Month => ("month", "MONTH"),
        Year => ("year", "YEAR"),
        All => ("all", "ALL"),
    }
}

pub const DEFAULT_REDDIT_SORT: RedditSort = RedditSort::Relevance;
pub const DEFAULT_REDDIT_TIME_RANGE: RedditTimeRange = RedditTimeRange::All;

/// Typed Reddit filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedditFilters {
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub subreddits: BTreeSet<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub include_nsfw: bool,
    #[serde(skip_serializing_if = "is_default_reddit_sort")]
    pub sort: RedditSort,
    #[serde(skip_serializing_if = "is_default_reddit_time_range")]
    pub time_range: RedditTimeRange,
}

impl Default for RedditFilters {
    fn default() -> Self {
        Self {
            subreddits: BTreeSet::new(),
            include_nsfw: false,
            sort: DEFAULT_REDDIT_SORT,
            time_range: DEFAULT_REDDIT_TIME_RANGE,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_default_reddit_sort(sort: &RedditSort) -> bool {
    *sort == DEFAULT_REDDIT_SORT
}

fn is_default_reddit_time_range(time_range: &RedditTimeRange) -> bool {
    *time_range == DEFAULT_REDDIT_TIME_RANGE
}

/// Filters for one source
///
/// Wallhaven filters are written as a bare `FilterSet` document. Every
/// other source adds a `"source"` tag, and a document without one is
/// read as Wallhaven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilters {
    Wallhaven(FilterSet),
    Reddit(RedditFilters),
}

impl SearchFilters {
    pub fn source(&self) -> Source {
        match self {
            SearchFilters::Wallhaven(_) => Source::Wallhaven,
            SearchFilters::Reddit(_) => Source::Reddit,
        }
    }

    pub fn as_wallhaven(&self) -> Option<&FilterSet> {
        match self {
            SearchFilters::Wallhaven(filters) => Some(filters),
            SearchFilters::Reddit(_) => None,
        }
    }

    pub fn as_reddit(&self) -> Option<&RedditFilters> {
        match self {
            SearchFilters::Reddit(filters) => Some(filters),
            SearchFilters::Wallhaven(_) => None,
        }
    }
}

impl Default for SearchFilters {
    fn default() -> Self {
        SearchFilters::Wallhaven(FilterSet::default())
    }
}

impl From<FilterSet> for SearchFilters {
    fn from(filters: FilterSet) -> Self {
        SearchFilters::Wallhaven(filters)
    }
}

impl From<RedditFilters> for SearchFilters {
    fn from(filters: RedditFilters) -> Self {
        SearchFilters::Reddit(filters)
    }
}

#[derive(Serialize)]
struct TaggedFilters<'a, T> {
    source: Source,
    #[serde(flatten)]
    filters: &'a T,
}

impl Serialize for SearchFilters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SearchFilters::Wallhaven(filters) => filters.serialize(serializer),
            SearchFilters::Reddit(filters) => TaggedFilters {
                source: Source::Reddit,
                filters,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SearchFilters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields: serde_json::Map<String, serde_json::Value> = Deserialize::deserialize(deserializer)?;
        let source = match fields.remove("source") {
            Some(tag) => Source::deserialize(tag).map_err(D::Error::custom)?,
            None => Source::Wallhaven,
        };

        let fields = serde_json::Value::Object(fields);
        match source {
            Source::Wallhaven => FilterSet::deserialize(fields).map(SearchFilters::Wallhaven),
            Source::Reddit => RedditFilters::deserialize(fields).map(SearchFilters::Reddit),
        }
        .map_err(D::Error::custom)
    }
}

/// A complete search: free-text query plus the filters of its source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    pub filters: SearchFilters,
}

impl SearchSpec {
    pub fn new(query: impl Into<String>, filters: impl Into<SearchFilters>) -> Self {
        Self {
            query: query.into(),
            filters: filters.into(),
        }
    }

    pub fn source(&self) -> Source {
        self.filters.source()
    }
}
