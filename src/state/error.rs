use super::event::WorkflowEvent;
use super::model::RecognitionState;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid state transition: from {from:?} using event {event:?}")]
    InvalidStateTransition {
        from: RecognitionState,
        event: WorkflowEvent,
    },
}
