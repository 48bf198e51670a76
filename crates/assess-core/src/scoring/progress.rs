//! Upload progress delivery.

use std::sync::{Arc, Mutex};

type Sink = dyn Fn(f64) + Send + Sync;

#[derive(Default)]
struct ProgressState {
    last: Option<f64>,
    completed: bool,
}

/// Delivers upload fractions to a sink.
///
/// Deliveries are clamped to `[0, 1]`, NaN and regressions are dropped, and
/// `1.0` is delivered at most once. Clones share state, so a reporter can be
/// moved into a body stream while the caller keeps a handle for `finish`.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<Sink>,
    state: Arc<Mutex<ProgressState>>,
}

impl ProgressReporter {
    pub fn new(sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
            state: Arc::new(Mutex::new(ProgressState::default())),
        }
    }

    /// Reporter that discards every delivery.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);

        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.completed {
            return;
        }
        if let Some(last) = state.last {
            if fraction <= last {
                return;
            }
        }
        state.last = Some(fraction);
        state.completed = fraction >= 1.0;
        // sink runs under the lock so deliveries stay ordered
        (self.sink)(fraction);
    }

    /// Deliver `1.0` unless it was already delivered.
    pub fn finish(&self) {
        self.report(1.0);
    }

    /// Last delivered fraction.
    pub fn last(&self) -> Option<f64> {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).last
    }

    pub fn is_complete(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .completed
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressReporter, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::new(move |v| sink.lock().unwrap().push(v));
        (reporter, seen)
    }

    #[test]
    fn test_deliveries_are_clamped_and_monotonic() {
        let (reporter, seen) = recording();
        reporter.report(-0.5);
        reporter.report(0.4);
        reporter.report(0.2);
        reporter.report(f64::NAN);
        reporter.report(0.4);
        reporter.report(0.7);
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 0.4, 0.7]);
    }

    #[test]
    fn test_completion_delivered_exactly_once() {
        let (reporter, seen) = recording();
        reporter.report(0.5);
        reporter.report(3.0);
        reporter.finish();
        reporter.clone().finish();
        let ones = seen.lock().unwrap().iter().filter(|v| **v == 1.0).count();
        assert_eq!(ones, 1);
        assert!(reporter.is_complete());
    }

    #[test]
    fn test_nothing_after_completion() {
        let (reporter, seen) = recording();
        reporter.finish();
        reporter.report(0.9);
        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
        assert_eq!(reporter.last(), Some(1.0));
    }
}
