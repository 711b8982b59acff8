use crate::exclusion::should_exclude_page;
use crate::html;
use crate::logging::logger::*;
use crate::logging::logging_defs::*;
use crate::models::{FilterOptions, Page, PageOutcome};
use crate::pruner::prune_tree;
use crate::rules::RuleSet;
use crate::substitution::apply_substitutions;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Runs pages through the three filtering stages.
///
/// For each page, in order: the title is checked against `EXCLUDE_PAGES`
/// (excluded pages are never parsed), the HTML is parsed and pruned of
/// excluded classes and ids, the pruned tree is serialised and the
/// `TEXT_REPLACE` rules are applied, and finally trailing whitespace is
/// trimmed.
///
/// A `PageFilter` is `Send + Sync` and holds no per-page state, so one
/// instance serves any number of threads.
pub struct PageFilter {
    rules: Arc<RuleSet>,
    options: FilterOptions,
}

impl PageFilter {
    pub fn new(rules: Arc<RuleSet>, options: FilterOptions) -> PageFilter {
        if options
            .debug_categories
            .contains(DebugLogsCategories::RULE_LOADING)
        {
            debug!(summary = %rules.summary(), "page filter ready");
        }
        PageFilter { rules, options }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    fn create_perf_logger(&self) -> PerfLogger {
        PerfLogger::new(self.options.perf_listeners.clone())
    }

    fn reports(&self, category: DebugLogsCategories) -> bool {
        self.options.debug_categories.contains(category)
    }

    /// Filter a single page.
    pub fn filter_page(&self, title: &str, html: &str) -> PageOutcome {
        let logger = self.create_perf_logger();
        start_span!(logger, FILTER_PAGE);

        start_span!(logger, PAGE_EXCLUSION);
        let excluded = should_exclude_page(title, &self.rules);
        end_span!(logger, PAGE_EXCLUSION);
        if excluded {
            if self.reports(DebugLogsCategories::PAGE_EXCLUSIONS) {
                debug!(title, "page excluded");
            }
            add_point_to_span_str!(logger, FILTER_PAGE, "excluded");
            end_span!(logger, FILTER_PAGE);
            return PageOutcome::Excluded {
                title: title.to_string(),
            };
        }

        start_span!(logger, PARSE_HTML);
        let mut document = html::parse_fragment(html);
        end_span!(logger, PARSE_HTML);

        start_span!(logger, PRUNE_TREE);
        let prune_stats = prune_tree(&mut document, &self.rules);
        d!({
            annotate_span!(
                logger,
                PRUNE_TREE,
                format!(
                    "removed {} by class, {} by id",
                    prune_stats.removed_by_class, prune_stats.removed_by_id
                )
            );
        });
        end_span!(logger, PRUNE_TREE);
        if prune_stats.removed() > 0 && self.reports(DebugLogsCategories::PRUNED_NODES) {
            debug!(
                title,
                by_class = prune_stats.removed_by_class,
                by_id = prune_stats.removed_by_id,
                "pruned elements"
            );
        }

        start_span!(logger, SERIALIZE_HTML);
        let serialized = html::serialize(&document);
        end_span!(logger, SERIALIZE_HTML);

        start_span!(logger, TEXT_SUBSTITUTION);
        let mut content = apply_substitutions(&serialized, &self.rules);
        end_span!(logger, TEXT_SUBSTITUTION);
        if self.reports(DebugLogsCategories::SUBSTITUTIONS) && content != serialized {
            debug!(
                title,
                before = serialized.len(),
                after = content.len(),
                "substitutions rewrote page"
            );
        }

        if self.options.trim_trailing_whitespace {
            content.truncate(content.trim_end().len());
        }

        end_span!(logger, FILTER_PAGE);
        PageOutcome::Filtered {
            title: title.to_string(),
            content,
            prune_stats,
        }
    }

    /// Filter many pages in parallel on the rayon thread pool.
    ///
    /// Pages are independent of one another and may be processed in any
    /// order; the returned outcomes are in the same order as `pages`.
    pub fn filter_pages(&self, pages: &[Page]) -> Vec<PageOutcome> {
        let logger = self.create_perf_logger();
        start_span!(logger, FILTER_BATCH);
        let outcomes: Vec<PageOutcome> = pages
            .par_iter()
            .map(|page| self.filter_page(&page.title, &page.html))
            .collect();
        d!({
            let excluded = outcomes.iter().filter(|o| o.is_excluded()).count();
            annotate_span!(
                logger,
                FILTER_BATCH,
                format!("{} pages, {} excluded", outcomes.len(), excluded)
            );
        });
        end_span!(logger, FILTER_BATCH);
        outcomes
    }
}
