use std::time::Duration;

/// Tone of a user-visible notice
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// Short reward/penalty/info message shown to the player
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub duration: Duration,
}

impl Notice {
    pub fn success(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            duration,
        }
    }

    pub fn error(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            duration,
        }
    }

    pub fn info(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            duration,
        }
    }
}

/// Receiver of notices (a toast layer in a UI)
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

impl<F: FnMut(Notice)> Notifier for F {
    fn notify(&mut self, notice: Notice) {
        self(notice)
    }
}

/// Notifier that only logs
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, notice: Notice) {
        tracing::debug!(level = %notice.level, message = %notice.message, "notice");
    }
}
