/// Span IDs for performance-logging events.  Each ID must be unique;
/// simply increment when adding a new span.
pub const FILTER_PAGE: u64 = 1;
pub const PAGE_EXCLUSION: u64 = 2;
pub const PARSE_HTML: u64 = 3;
pub const PRUNE_TREE: u64 = 4;
pub const SERIALIZE_HTML: u64 = 5;
pub const TEXT_SUBSTITUTION: u64 = 6;
pub const FILTER_BATCH: u64 = 7;

pub fn name(span_id: u64) -> &'static str {
    match span_id {
        FILTER_PAGE => "FILTER_PAGE",
        PAGE_EXCLUSION => "PAGE_EXCLUSION",
        PARSE_HTML => "PARSE_HTML",
        PRUNE_TREE => "PRUNE_TREE",
        SERIALIZE_HTML => "SERIALIZE_HTML",
        TEXT_SUBSTITUTION => "TEXT_SUBSTITUTION",
        FILTER_BATCH => "FILTER_BATCH",
        _ => "UNKNOWN_SPAN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_span_has_a_distinct_name() {
        let ids = [
            FILTER_PAGE,
            PAGE_EXCLUSION,
            PARSE_HTML,
            PRUNE_TREE,
            SERIALIZE_HTML,
            TEXT_SUBSTITUTION,
            FILTER_BATCH,
        ];
        let mut names: Vec<_> = ids.iter().map(|id| name(*id)).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ids.len());
        assert!(!names.contains(&"UNKNOWN_SPAN"));
        assert_eq!(name(999), "UNKNOWN_SPAN");
    }
}
