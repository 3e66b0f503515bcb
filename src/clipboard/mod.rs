use std::io::{self, Write};
use std::process::{Command, Stdio};

use thiserror::Error;

const WL_COPY_COMMAND: &str = "wl-copy";
const MIME_TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to run clipboard command: {command}")]
    CommandIo {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{command} exited with non-zero status: {status}")]
    CommandFailed { command: String, status: String },
    #[error("failed to access default display for clipboard operations")]
    DisplayUnavailable,
}

pub type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

pub trait ClipboardBackend {
    fn copy_text(&self, text: &str) -> ClipboardResult<()>;
}

/// Pipes text into `wl-copy`.
#[derive(Debug, Default)]
pub struct WlCopyBackend;

impl ClipboardBackend for WlCopyBackend {
    fn copy_text(&self, text: &str) -> ClipboardResult<()> {
        pipe_text(WL_COPY_COMMAND, &["--type", MIME_TEXT_PLAIN_UTF8], text)
    }
}

/// Writes `text` to the stdin of `program` and waits for it. The child is
/// always reaped, also when the write fails.
fn pipe_text(program: &str, args: &[&str], text: &str) -> ClipboardResult<()> {
    let command_io = |source| ClipboardError::CommandIo {
        command: program.to_string(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .map_err(command_io)?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(source) = stdin.write_all(text.as_bytes()) {
            drop(stdin);
            // The child may already be gone; either way it has to be reaped.
            let _ = child.kill();
            let _ = child.wait();
            return Err(command_io(source));
        }
    }

    let status = child.wait().map_err(command_io)?;
    if status.success() {
        Ok(())
    } else {
        Err(ClipboardError::CommandFailed {
            command: program.to_string(),
            status: status.to_string(),
        })
    }
}

/// Tries `primary` first and retries with `secondary` when it fails.
#[derive(Debug, Default)]
pub struct FallbackBackend<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackBackend<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: ClipboardBackend, S: ClipboardBackend> ClipboardBackend for FallbackBackend<P, S> {
    fn copy_text(&self, text: &str) -> ClipboardResult<()> {
        match self.primary.copy_text(text) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::debug!(%err, "primary clipboard backend failed; trying fallback");
                self.secondary.copy_text(text)
            }
        }
    }
}

/// Sets text on the GDK display clipboard.
#[cfg(feature = "gui")]
#[derive(Debug, Default)]
pub struct GdkClipboardBackend;

#[cfg(feature = "gui")]
impl ClipboardBackend for GdkClipboardBackend {
    fn copy_text(&self, text: &str) -> ClipboardResult<()> {
        use gtk4::gdk::prelude::*;

        let display = gtk4::gdk::Display::default().ok_or(ClipboardError::DisplayUnavailable)?;
        display.clipboard().set_text(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryBackend {
        contents: RefCell<Option<String>>,
    }

    impl ClipboardBackend for MemoryBackend {
        fn copy_text(&self, text: &str) -> ClipboardResult<()> {
            *self.contents.borrow_mut() = Some(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn copy_text_with_backend() {
        let backend = MemoryBackend::default();
        backend.copy_text("INVOICE #42").expect("copy");
        assert_eq!(backend.contents.borrow().as_deref(), Some("INVOICE #42"));
    }

    struct FailingBackend;

    impl ClipboardBackend for FailingBackend {
        fn copy_text(&self, _text: &str) -> ClipboardResult<()> {
            Err(ClipboardError::DisplayUnavailable)
        }
    }

    #[test]
    fn fallback_used_only_when_primary_fails() {
        let backend = FallbackBackend::new(FailingBackend, MemoryBackend::default());
        backend.copy_text("fallback").expect("copy");
        assert_eq!(backend.secondary.contents.borrow().as_deref(), Some("fallback"));

        let backend = FallbackBackend::new(MemoryBackend::default(), MemoryBackend::default());
        backend.copy_text("primary").expect("copy");
        assert_eq!(backend.primary.contents.borrow().as_deref(), Some("primary"));
        assert!(backend.secondary.contents.borrow().is_none());
    }

    #[test]
    fn both_backends_failing_reports_secondary_error() {
        let backend = FallbackBackend::new(FailingBackend, FailingBackend);
        assert!(matches!(
            backend.copy_text("x"),
            Err(ClipboardError::DisplayUnavailable)
        ));
    }

    #[test]
    fn command_error_contains_command_name() {
        let err = ClipboardError::CommandFailed {
            command: WL_COPY_COMMAND.to_string(),
            status: "exit status 1".to_string(),
        };
        assert!(format!("{err}").contains("wl-copy"));
    }

    #[cfg(unix)]
    #[test]
    fn write_failure_reaps_child_and_reports_io_error() {
        // `true` exits without reading, so a large write hits a closed pipe.
        let text = "x".repeat(4 * 1024 * 1024);
        let err = pipe_text("true", &[], &text).unwrap_err();
        assert!(matches!(
            err,
            ClipboardError::CommandIo { ref command, ref source }
                if command == "true" && source.kind() == io::ErrorKind::BrokenPipe
        ));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_reported_with_command_name() {
        let err = pipe_text("false", &[], "").unwrap_err();
        assert!(matches!(
            err,
            ClipboardError::CommandFailed { ref command, .. } if command == "false"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn piped_text_reaches_the_command() {
        assert!(pipe_text("cat", &[], "INVOICE #42").is_ok());
    }

    #[test]
    fn command_io_error_names_the_command() {
        let err = ClipboardError::CommandIo {
            command: WL_COPY_COMMAND.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(format!("{err}"), "failed to run clipboard command: wl-copy");
    }
}
