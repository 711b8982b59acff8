use bitflags::bitflags;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

bitflags! {
    /// Which per-page decisions the pipeline reports at `debug` level.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DebugLogsCategories: u32 {
        const RULE_LOADING             = 1 << 1;
        const PAGE_EXCLUSIONS          = 1 << 2;
        const PRUNED_NODES             = 1 << 3;
        const SUBSTITUTIONS            = 1 << 4;
        const ALL                      = u32::MAX;
    }
}

impl Default for DebugLogsCategories {
    fn default() -> Self {
        DebugLogsCategories::empty()
    }
}

/// Observer interface for performance-span events.  Implement this trait
/// and wrap it in a [`Listener`] to receive timing data from the filtering
/// pipeline.
///
/// All methods are called synchronously from the worker that processes the
/// page; keep them lightweight.
pub trait PerfListener: Send + Sync {
    /// Return whether this listener cares about the given span.  If `false`,
    /// none of the other callbacks will fire for that span.
    fn is_interested_in_span(&self, span_id: u64) -> bool;
    /// Called when a span begins.
    fn on_span_start(&self, span_id: u64, start_time: Instant);
    /// Called at each checkpoint within a span, with the wall-clock duration
    /// since the previous checkpoint (or span start).
    fn on_check_point(
        &self,
        span_id: u64,
        point_time: Instant,
        duration_since_last_checkpoint: Duration,
        label: &str,
    );
    /// Called when a free-text annotation is attached to a span.
    fn on_annotate(&self, span_id: u64, annotation: &str);
    /// Called when a span ends, with its total duration.
    fn on_span_end(&self, span_id: u64, span_duration: Duration);
}

/// A clonable, shareable wrapper around a [`PerfListener`].
/// Clone is cheap (an `Arc` bump); the underlying listener is shared by
/// every page that is processed.
#[derive(Clone)]
pub struct Listener {
    inner_impl: Arc<dyn PerfListener>,
}

impl Listener {
    /// Wrap a [`PerfListener`] implementation for use with [`PerfLogger`].
    pub fn new(listener: Arc<dyn PerfListener>) -> Listener {
        Listener {
            inner_impl: listener,
        }
    }
}

impl Deref for Listener {
    type Target = dyn PerfListener;
    fn deref(&self) -> &Self::Target {
        &*self.inner_impl
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener")
    }
}

struct PerfEvent {
    span_id: u64,
    start_time: Instant,
    last_point: Option<Instant>,
    listeners: Vec<Listener>,
}

impl PerfEvent {
    fn point(&mut self, label: &str) {
        let time = Instant::now();
        let duration_since_last_checkpoint =
            time.duration_since(self.last_point.unwrap_or(self.start_time));
        self.listeners.iter().for_each(|l| {
            l.on_check_point(self.span_id, time, duration_since_last_checkpoint, label)
        });
        self.last_point = Some(time);
    }

    fn annotate(&self, annotation: &str) {
        self.listeners.iter().for_each(|l| {
            l.on_annotate(self.span_id, annotation);
        });
    }
}

/// Tracks in-flight performance spans and fans events out to registered
/// [`Listener`]s.
///
/// **Not `Sync`**: the internal event map uses `RefCell`.  Each page gets its
/// own `PerfLogger`, created on the worker thread that filters it.
pub struct PerfLogger {
    events: RefCell<HashMap<u64, PerfEvent>>,
    listeners: Vec<Listener>,
}

impl PerfLogger {
    /// Create a new logger with the given set of listeners.  Pass an empty
    /// `Vec` to disable all perf logging (zero overhead in that case).
    pub fn new(listeners: Vec<Listener>) -> PerfLogger {
        PerfLogger {
            events: RefCell::new(HashMap::new()),
            listeners,
        }
    }

    /// Begin a new span identified by `span_id`.  Only listeners that
    /// return `true` from [`PerfListener::is_interested_in_span`] are
    /// notified and stored.
    pub fn start(&self, span_id: u64) {
        let event_listeners = self
            .listeners
            .iter()
            .filter(|l| l.is_interested_in_span(span_id))
            .cloned()
            .collect::<Vec<_>>();
        if !event_listeners.is_empty() {
            let start_time = Instant::now();
            event_listeners
                .iter()
                .for_each(|l| l.on_span_start(span_id, start_time));
            let event = PerfEvent {
                span_id,
                start_time,
                last_point: None,
                listeners: event_listeners,
            };
            self.events.borrow_mut().insert(span_id, event);
        }
    }

    /// Record a checkpoint inside the given span.
    pub fn check_point_str(&self, span_id: u64, label: &str) {
        if let Some(event) = self.events.borrow_mut().get_mut(&span_id) {
            event.point(label);
        }
    }

    /// Attach a free-text annotation to the given span.
    pub fn annotate(&self, span_id: u64, annotation: String) {
        if let Some(event) = self.events.borrow().get(&span_id) {
            event.annotate(annotation.as_str());
        }
    }

    /// End the span, notify listeners with the total duration, and remove
    /// it from the active-events map.
    pub fn end(&self, span_id: u64) {
        if let Some(event) = self.events.borrow_mut().remove(&span_id) {
            let duration = Instant::now().duration_since(event.start_time);
            event.listeners.iter().for_each(|l| {
                l.on_span_end(span_id, duration);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        only: Option<u64>,
        events: Mutex<Vec<String>>,
    }

    impl PerfListener for Recorder {
        fn is_interested_in_span(&self, span_id: u64) -> bool {
            self.only.map_or(true, |only| only == span_id)
        }
        fn on_span_start(&self, span_id: u64, _start_time: Instant) {
            self.events.lock().unwrap().push(format!("start {span_id}"));
        }
        fn on_check_point(&self, span_id: u64, _: Instant, _: Duration, label: &str) {
            self.events.lock().unwrap().push(format!("point {span_id} {label}"));
        }
        fn on_annotate(&self, span_id: u64, annotation: &str) {
            self.events.lock().unwrap().push(format!("note {span_id} {annotation}"));
        }
        fn on_span_end(&self, span_id: u64, _: Duration) {
            self.events.lock().unwrap().push(format!("end {span_id}"));
        }
    }

    #[test]
    fn events_reach_interested_listeners_in_order() {
        let recorder = Arc::new(Recorder::default());
        let logger = PerfLogger::new(vec![Listener::new(recorder.clone())]);
        logger.start(1);
        logger.check_point_str(1, "parsed");
        logger.annotate(1, "3 removed".to_string());
        logger.end(1);
        // ended spans are forgotten
        logger.check_point_str(1, "late");
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["start 1", "point 1 parsed", "note 1 3 removed", "end 1"]
        );
    }

    #[test]
    fn uninterested_listeners_see_nothing() {
        let recorder = Arc::new(Recorder {
            only: Some(2),
            ..Recorder::default()
        });
        let logger = PerfLogger::new(vec![Listener::new(recorder.clone())]);
        logger.start(1);
        logger.check_point_str(1, "ignored");
        logger.end(1);
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn debug_categories_combine() {
        let categories = DebugLogsCategories::PAGE_EXCLUSIONS | DebugLogsCategories::PRUNED_NODES;
        assert!(categories.contains(DebugLogsCategories::PRUNED_NODES));
        assert!(!categories.contains(DebugLogsCategories::SUBSTITUTIONS));
        assert!(DebugLogsCategories::ALL.contains(categories));
        assert!(DebugLogsCategories::default().is_empty());
    }
}
