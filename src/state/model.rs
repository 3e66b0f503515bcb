/// Where the current image is in its recognition lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecognitionState {
    #[default]
    Idle,
    Processing {
        progress: u8,
    },
    Succeeded {
        text: String,
    },
    Failed {
        message: String,
    },
}

impl RecognitionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing { .. } => "processing",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing { .. })
    }

    /// Percent complete while processing, 0 otherwise.
    pub fn progress(&self) -> u8 {
        match self {
            Self::Processing { progress } => *progress,
            _ => 0,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Succeeded { text } => Some(text),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }
}
