use crate::logging::logger::{DebugLogsCategories, Listener};
use crate::pruner::PruneStats;
use serde::Serialize;

/// Knobs for [`crate::PageFilter`].
///
/// All fields have sensible defaults via [`Default`]; start there and only
/// override what you need.
///
/// # Examples
///
/// ```rust
/// use wikifilter_rs::{DebugLogsCategories, FilterOptions};
///
/// let mut opts = FilterOptions::default();
/// opts.debug_categories = DebugLogsCategories::PAGE_EXCLUSIONS;
/// opts.trim_trailing_whitespace = false;
/// ```
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Strip trailing whitespace from the final page text.
    pub trim_trailing_whitespace: bool,
    /// Per-page decisions to report through `tracing::debug!`.
    pub debug_categories: DebugLogsCategories,
    /// Receivers of per-stage timing spans.  Spans are only emitted in
    /// debug builds; an empty list costs nothing.
    pub perf_listeners: Vec<Listener>,
}

impl Default for FilterOptions {
    fn default() -> FilterOptions {
        FilterOptions {
            trim_trailing_whitespace: true,
            debug_categories: DebugLogsCategories::empty(),
            perf_listeners: vec![],
        }
    }
}

/// One rendered page handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Namespace-qualified title, e.g. `"Template:Navbox"` or `"Paris"`.
    pub title: String,
    /// Rendered HTML of the page body.
    pub html: String,
}

impl Page {
    pub fn new<T: Into<String>, H: Into<String>>(title: T, html: H) -> Page {
        Page {
            title: title.into(),
            html: html.into(),
        }
    }
}

/// The result of running one page through [`crate::PageFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    /// The title is listed in `EXCLUDE_PAGES`; the page was not parsed.
    Excluded { title: String },
    /// The page was pruned and rewritten.
    Filtered {
        title: String,
        content: String,
        prune_stats: PruneStats,
    },
}

impl PageOutcome {
    pub fn title(&self) -> &str {
        match self {
            PageOutcome::Excluded { title } | PageOutcome::Filtered { title, .. } => title,
        }
    }

    /// The filtered HTML, or `None` for an excluded page.
    pub fn content(&self) -> Option<&str> {
        match self {
            PageOutcome::Excluded { .. } => None,
            PageOutcome::Filtered { content, .. } => Some(content),
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, PageOutcome::Excluded { .. })
    }
}
