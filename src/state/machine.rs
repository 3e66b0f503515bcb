use std::collections::VecDeque;

use super::error::{StateError, StateResult};
use super::{RecognitionState, StateTransition, WorkflowEvent};

const HISTORY_LIMIT: usize = 256;

#[derive(Debug)]
pub struct StateMachine {
    state: RecognitionState,
    transition_history: VecDeque<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: RecognitionState::default(),
            transition_history: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &RecognitionState {
        &self.state
    }

    pub fn can_transition(&self, event: &WorkflowEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: &WorkflowEvent) -> Option<RecognitionState> {
        use RecognitionState::*;
        use WorkflowEvent as Ev;
        match (&self.state, event) {
            (Idle | Succeeded { .. } | Failed { .. }, Ev::Start) => Some(Processing { progress: 0 }),
            (Processing { .. }, Ev::Progress(percent)) => Some(Processing {
                progress: (*percent).min(100),
            }),
            (Processing { .. }, Ev::Complete(text)) => Some(Succeeded { text: text.clone() }),
            (Processing { .. }, Ev::Fail(message)) => Some(Failed {
                message: message.clone(),
            }),
            (_, Ev::Reset) => Some(Idle),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: WorkflowEvent) -> StateResult<&RecognitionState> {
        tracing::trace!(from = self.state.name(), event = event.name(), "request state transition");
        let Some(next) = self.next_state(&event) else {
            tracing::warn!(
                from = self.state.name(),
                event = event.name(),
                "invalid state transition requested"
            );
            return Err(StateError::InvalidStateTransition {
                from: self.state.clone(),
                event,
            });
        };

        let from = std::mem::replace(&mut self.state, next.clone());
        if self.transition_history.len() == HISTORY_LIMIT {
            self.transition_history.pop_front();
        }
        self.transition_history
            .push_back(StateTransition::new(from, event, next));

        Ok(&self.state)
    }

    /// Accepted transitions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.transition_history.iter()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecognitionState::{}", self.state.name())
    }
}
