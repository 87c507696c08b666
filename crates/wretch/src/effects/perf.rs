//! Resource timing primitives consulted by [`ResponseChain::perfs`].
//!
//! [`ResponseChain::perfs`]: crate::ResponseChain::perfs

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tracing::trace;

use super::fetch::Fetch;
use crate::data::{RequestInit, Response};
use crate::error::TransportError;

/// One recorded measurement. Times are in milliseconds from the timeline origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceEntry {
    pub name: String,
    pub entry_type: &'static str,
    pub start_time: f64,
    pub duration: f64,
}

/// Callback fired once with the measurement of a request.
pub type PerfCallback = Box<dyn FnOnce(PerformanceEntry) + Send>;

/// Timing primitive set: marks, measures and an observer.
pub trait Performance: Send + Sync {
    fn mark(&self, label: &str);

    /// Drop a mark no measure will consume.
    fn clear_marks(&self, _label: &str) {}

    /// Record a measure named `name` spanning two earlier marks. Both marks
    /// are consumed.
    fn measure(&self, name: &str, start: &str, end: &str);

    /// Latest measure recorded under `name`.
    fn entry(&self, name: &str) -> Option<PerformanceEntry>;

    fn clear_measures(&self, name: &str);

    /// Deliver one measure named `name` to `callback` exactly once.
    ///
    /// If such a measure is already recorded the callback fires right away,
    /// otherwise it fires when the next one is recorded. Either way the
    /// delivered measure is removed and no other observer receives it.
    fn observe(&self, name: &str, callback: PerfCallback);
}

/// In-process [`Performance`] implementation based on [`Instant`].
///
/// Unobserved measures and pending observers are each capped at
/// [`Timeline::BUFFER_SIZE`]; the oldest is dropped first.
pub struct Timeline {
    origin: Instant,
    state: Mutex<TimelineState>,
}

#[derive(Default)]
struct TimelineState {
    marks: HashMap<String, Instant>,
    measures: VecDeque<PerformanceEntry>,
    observers: VecDeque<(String, PerfCallback)>,
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Timeline")
            .field("marks", &state.marks.len())
            .field("measures", &state.measures.len())
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub const BUFFER_SIZE: usize = 150;

    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(TimelineState::default()),
        }
    }

    fn millis(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

impl Performance for Timeline {
    fn mark(&self, label: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.marks.insert(label.to_owned(), Instant::now());
    }

    fn clear_marks(&self, label: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.marks.remove(label);
    }

    fn measure(&self, name: &str, start: &str, end: &str) {
        let (entry, observer) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(begin) = state.marks.remove(start) else {
                trace!(name, start, "measure skipped, unknown start mark");
                return;
            };
            let finish = state.marks.remove(end).unwrap_or_else(Instant::now);
            let entry = PerformanceEntry {
                name: name.to_owned(),
                entry_type: "measure",
                start_time: self.millis(begin),
                duration: finish.saturating_duration_since(begin).as_secs_f64() * 1000.0,
            };
            let waiting = state.observers.iter().position(|(observed, _)| observed == name);
            match waiting.and_then(|index| state.observers.remove(index)) {
                Some((_, observer)) => (entry, observer),
                None => {
                    if state.measures.len() == Self::BUFFER_SIZE {
                        state.measures.pop_front();
                    }
                    state.measures.push_back(entry);
                    return;
                }
            }
        };
        // Observers run outside the lock so they may use the timeline.
        observer(entry);
    }

    fn entry(&self, name: &str) -> Option<PerformanceEntry> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.measures.iter().rev().find(|e| e.name == name).cloned()
    }

    fn clear_measures(&self, name: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.measures.retain(|e| e.name != name);
    }

    fn observe(&self, name: &str, callback: PerfCallback) {
        let ready = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let recorded = state.measures.iter().position(|e| e.name == name);
            match recorded.and_then(|index| state.measures.remove(index)) {
                Some(entry) => entry,
                None => {
                    if state.observers.len() == Self::BUFFER_SIZE {
                        state.observers.pop_front();
                        trace!(name, "oldest pending observer dropped");
                    }
                    state.observers.push_back((name.to_owned(), callback));
                    return;
                }
            }
        };
        callback(ready);
    }
}

/// Transport decorator recording a measure for every successful call.
///
/// Marks `"<url> - begin #<n>"` before the call and `"<url> - end #<n>"` once
/// the response arrives, `n` being unique per call, then measures under the
/// response URL. With a delay the measure is taken later on a spawned task,
/// so the response settles before the measurement exists. A failed call
/// clears its begin mark.
pub struct Timed<F> {
    inner: F,
    performance: Arc<dyn Performance>,
    delay: Option<Duration>,
    calls: AtomicU64,
}

impl<F: Fetch> Timed<F> {
    pub fn new(inner: F, performance: Arc<dyn Performance>) -> Self {
        Self {
            inner,
            performance,
            delay: None,
            calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl<F: Fetch> Fetch for Timed<F> {
    fn fetch(&self, url: &str, init: RequestInit) -> BoxFuture<'static, Result<Response, TransportError>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let begin = format!("{url} - begin #{call}");
        let end = format!("{url} - end #{call}");
        self.performance.mark(&begin);

        let pending = self.inner.fetch(url, init);
        let performance = Arc::clone(&self.performance);
        let delay = self.delay;

        Box::pin(async move {
            let response = match pending.await {
                Ok(response) => response,
                Err(e) => {
                    performance.clear_marks(&begin);
                    return Err(e);
                }
            };
            performance.mark(&end);
            let name = response.url().to_owned();
            match delay {
                Some(delay) => {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        performance.measure(&name, &begin, &end);
                    });
                }
                None => performance.measure(&name, &begin, &end),
            }
            Ok(response)
        })
    }
}
