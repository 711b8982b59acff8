pub mod logger;

pub mod logging_defs;
#[macro_use]
pub mod macros;

use logger::PerfListener;
use logging_defs::*;
use std::time::Duration;
use std::time::Instant;

/// A [`PerfListener`] that forwards every span event to `tracing` at
/// `trace` level under the `wikifilter::perf` target.
///
/// Enable it with `RUST_LOG=wikifilter::perf=trace` (or `-vvv` on the CLI).
pub struct PerfTracingListener;

impl PerfListener for PerfTracingListener {
    fn is_interested_in_span(&self, _span_id: u64) -> bool {
        tracing::enabled!(target: "wikifilter::perf", tracing::Level::TRACE)
    }

    fn on_span_start(&self, span_id: u64, _start_time: Instant) {
        tracing::trace!(target: "wikifilter::perf", span = name(span_id), "start");
    }

    fn on_check_point(
        &self,
        span_id: u64,
        _point_time: Instant,
        duration_since_last_checkpoint: Duration,
        point_label: &str,
    ) {
        tracing::trace!(
            target: "wikifilter::perf",
            span = name(span_id),
            point = point_label,
            seconds = duration_since_last_checkpoint.as_secs_f64(),
            "checkpoint"
        );
    }

    fn on_annotate(&self, span_id: u64, annotation: &str) {
        tracing::trace!(target: "wikifilter::perf", span = name(span_id), annotation, "annotation");
    }

    fn on_span_end(&self, span_id: u64, span_duration: Duration) {
        tracing::trace!(
            target: "wikifilter::perf",
            span = name(span_id),
            seconds = span_duration.as_secs_f64(),
            "end"
        );
    }
}
