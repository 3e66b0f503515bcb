use super::model::RecognitionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Start,
    Progress(u8),
    Complete(String),
    Fail(String),
    Reset,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Progress(_) => "progress",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: RecognitionState,
    pub event: WorkflowEvent,
    pub to: RecognitionState,
}

impl StateTransition {
    pub fn new(from: RecognitionState, event: WorkflowEvent, to: RecognitionState) -> Self {
        Self { from, event, to }
    }
}
