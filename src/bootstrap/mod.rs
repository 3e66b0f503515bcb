//! Scripted loading sequence shown once at startup.
//!
//! Purely cosmetic: it does not wait for anything real. Steps advance on a
//! fixed interval; one interval after the last step the timer stops and the
//! completion callback fires after a further delay.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;

pub const STEP_INTERVAL: Duration = Duration::from_millis(800);
pub const COMPLETION_DELAY: Duration = Duration::from_millis(1000);
pub const INITIAL_LABEL: &str = "Initializing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingStep {
    pub progress: u8,
    pub label: &'static str,
}

pub const LOADING_STEPS: [LoadingStep; 5] = [
    LoadingStep {
        progress: 20,
        label: "Loading OCR Engine...",
    },
    LoadingStep {
        progress: 40,
        label: "Setting up Image Processing...",
    },
    LoadingStep {
        progress: 60,
        label: "Preparing Text Recognition...",
    },
    LoadingStep {
        progress: 80,
        label: "Finalizing Setup...",
    },
    LoadingStep {
        progress: 100,
        label: "Ready!",
    },
];

type CompletionCallback = Box<dyn FnOnce()>;

pub struct LoadingSequence {
    clock: Arc<dyn Clock>,
    started_at: Instant,
    steps_applied: usize,
    on_complete: Option<CompletionCallback>,
    complete: bool,
}

impl LoadingSequence {
    pub fn start(clock: Arc<dyn Clock>, on_complete: impl FnOnce() + 'static) -> Self {
        let started_at = clock.now();
        Self {
            clock,
            started_at,
            steps_applied: 0,
            on_complete: Some(Box::new(on_complete)),
            complete: false,
        }
    }

    /// Total time from start until the completion callback fires.
    pub fn total_duration() -> Duration {
        STEP_INTERVAL * (LOADING_STEPS.len() as u32 + 1) + COMPLETION_DELAY
    }

    /// Catches up with the clock. Late ticks apply every step that came due.
    pub fn tick(&mut self) {
        if self.complete {
            return;
        }
        let elapsed = self.clock.now().saturating_duration_since(self.started_at);
        let intervals = (elapsed.as_millis() / STEP_INTERVAL.as_millis()) as usize;

        let due = intervals.min(LOADING_STEPS.len());
        if due > self.steps_applied {
            self.steps_applied = due;
            tracing::debug!(
                step = due,
                progress = self.progress(),
                label = self.label(),
                "loading step"
            );
        }

        if elapsed >= Self::total_duration() {
            self.complete = true;
            if let Some(on_complete) = self.on_complete.take() {
                tracing::debug!("loading sequence complete");
                on_complete();
            }
        }
    }

    pub fn progress(&self) -> u8 {
        self.current_step().map_or(0, |step| step.progress)
    }

    pub fn label(&self) -> &'static str {
        self.current_step().map_or(INITIAL_LABEL, |step| step.label)
    }

    /// Zero-based index of the step on display, if any has been reached.
    pub fn step_index(&self) -> Option<usize> {
        self.steps_applied.checked_sub(1)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    fn current_step(&self) -> Option<&'static LoadingStep> {
        self.step_index().map(|index| &LOADING_STEPS[index])
    }
}

impl fmt::Debug for LoadingSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingSequence")
            .field("steps_applied", &self.steps_applied)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::Cell;
    use std::rc::Rc;

    fn sequence() -> (ManualClock, Rc<Cell<u32>>, LoadingSequence) {
        let clock = ManualClock::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let sequence = LoadingSequence::start(Arc::new(clock.clone()), move || {
            counter.set(counter.get() + 1);
        });
        (clock, calls, sequence)
    }

    #[test]
    fn starts_at_initial_label() {
        let (_, _, mut sequence) = sequence();
        sequence.tick();
        assert_eq!(sequence.progress(), 0);
        assert_eq!(sequence.label(), INITIAL_LABEL);
        assert_eq!(sequence.step_index(), None);
    }

    #[test]
    fn steps_advance_every_interval() {
        let (clock, _, mut sequence) = sequence();
        let mut seen = Vec::new();
        for _ in 0..LOADING_STEPS.len() {
            clock.advance(STEP_INTERVAL);
            sequence.tick();
            seen.push((sequence.progress(), sequence.label()));
        }
        let expected: Vec<_> = LOADING_STEPS
            .iter()
            .map(|step| (step.progress, step.label))
            .collect();
        assert_eq!(seen, expected);
        assert!(!sequence.is_complete());
    }

    #[test]
    fn completes_once_at_5800ms() {
        let (clock, calls, mut sequence) = sequence();
        clock.advance(Duration::from_millis(5799));
        sequence.tick();
        assert_eq!(calls.get(), 0);

        clock.advance(Duration::from_millis(1));
        sequence.tick();
        sequence.tick();
        clock.advance(Duration::from_secs(60));
        sequence.tick();

        assert_eq!(calls.get(), 1);
        assert!(sequence.is_complete());
        assert_eq!(sequence.label(), "Ready!");
    }

    #[test]
    fn single_late_tick_catches_up() {
        let (clock, calls, mut sequence) = sequence();
        clock.advance(Duration::from_secs(10));
        sequence.tick();
        assert_eq!(sequence.progress(), 100);
        assert_eq!(calls.get(), 1);
    }
}
