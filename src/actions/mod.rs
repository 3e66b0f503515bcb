//! Read-only operations on the recognized text.

use std::path::PathBuf;

use thiserror::Error;

use crate::clipboard::{ClipboardBackend, ClipboardError};
use crate::notification::Severity;
use crate::storage::{StorageError, TextExporter, EXTRACTED_TEXT_FILE_NAME};
use crate::workflow::Workflow;

pub const COPY_SUCCEEDED_TOAST: &str = "Text copied to clipboard!";
pub const COPY_FAILED_TOAST: &str = "Failed to copy text";
pub const DOWNLOAD_SUCCEEDED_TOAST: &str = "Text downloaded successfully!";
pub const DOWNLOAD_FAILED_TOAST: &str = "Failed to download text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultAction {
    Copy,
    Download,
}

impl ResultAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Download => "download",
        }
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no recognized text to {}", .action.as_str())]
    NoText { action: ResultAction },

    #[error("clipboard error while copying text: {source}")]
    Clipboard {
        #[source]
        source: ClipboardError,
    },

    #[error("storage error while saving {file_name}: {source}")]
    Storage {
        file_name: &'static str,
        #[source]
        source: StorageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStatistics {
    pub characters: usize,
    pub words: usize,
}

/// Characters are Unicode scalar values; words are maximal runs of
/// non-whitespace.
pub fn text_statistics(text: &str) -> TextStatistics {
    TextStatistics {
        characters: text.chars().count(),
        words: text.split_whitespace().count(),
    }
}

pub fn copy_to_clipboard(
    workflow: &mut Workflow,
    clipboard: &dyn ClipboardBackend,
) -> Result<(), ActionError> {
    let text = current_text(workflow, ResultAction::Copy)?;
    match clipboard.copy_text(&text) {
        Ok(()) => {
            workflow
                .notifications_mut()
                .push(COPY_SUCCEEDED_TOAST, Severity::Success);
            Ok(())
        }
        Err(source) => {
            tracing::error!(err = %source, "failed to copy text");
            workflow
                .notifications_mut()
                .push(COPY_FAILED_TOAST, Severity::Error);
            Err(ActionError::Clipboard { source })
        }
    }
}

pub fn download_as_file(
    workflow: &mut Workflow,
    exporter: &dyn TextExporter,
) -> Result<PathBuf, ActionError> {
    let text = current_text(workflow, ResultAction::Download)?;
    match exporter.export(EXTRACTED_TEXT_FILE_NAME, &text) {
        Ok(path) => {
            workflow
                .notifications_mut()
                .push(DOWNLOAD_SUCCEEDED_TOAST, Severity::Success);
            Ok(path)
        }
        Err(source) => {
            tracing::error!(err = %source, "failed to download text");
            workflow
                .notifications_mut()
                .push(DOWNLOAD_FAILED_TOAST, Severity::Error);
            Err(ActionError::Storage {
                file_name: EXTRACTED_TEXT_FILE_NAME,
                source,
            })
        }
    }
}

fn current_text(workflow: &Workflow, action: ResultAction) -> Result<String, ActionError> {
    workflow
        .result_text()
        .map(str::to_string)
        .ok_or(ActionError::NoText { action })
}
