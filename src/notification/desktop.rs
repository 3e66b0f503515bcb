use super::{Notification, NotificationSink, Severity};

const APP_NAME: &str = "SnapText";

pub(super) fn send(summary: &str, body: impl Into<String>) {
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname(APP_NAME)
        .summary(summary)
        .body(&body)
        .show()
    {
        tracing::warn!("desktop notification failed: {err}");
    }
}

/// Mirrors toasts to the desktop notification daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopSink;

impl NotificationSink for DesktopSink {
    fn deliver(&self, notification: &Notification) {
        send(summary_for(notification.severity), notification.message.clone());
    }
}

fn summary_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Info | Severity::Success => APP_NAME,
        Severity::Warning => "SnapText warning",
        Severity::Error => "SnapText error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_marks_problems() {
        assert_eq!(summary_for(Severity::Success), "SnapText");
        assert_eq!(summary_for(Severity::Error), "SnapText error");
    }
}
