//! 用户通知
//!
//! 查看器里的弹出通知在这里抽象为 `Notifier`，命令行下通过 tracing 输出

use std::sync::Mutex;
use std::time::Duration;

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub duration: Duration,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationKind::Success, Duration::from_secs(3))
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationKind::Warning, Duration::from_secs(3))
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationKind::Error, Duration::from_secs(5))
    }

    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        duration: Duration,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            duration,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn show(&self, notification: Notification);
}

/// 通过日志输出通知
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, n: Notification) {
        match n.kind {
            NotificationKind::Success => info!("✓ {}: {}", n.title, n.message),
            NotificationKind::Info => info!("{}: {}", n.title, n.message),
            NotificationKind::Warning => warn!("⚠️ {}: {}", n.title, n.message),
            NotificationKind::Error => error!("❌ {}: {}", n.title, n.message),
        }
    }
}

/// 记录所有通知，供测试和演练模式汇总使用
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.shown
            .lock()
            .map(|shown| shown.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, notification: Notification) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        assert_eq!(Notification::success("a", "b").duration, Duration::from_secs(3));
        assert_eq!(Notification::error("a", "b").duration, Duration::from_secs(5));
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.show(Notification::warning("No Measurements", "nothing to export"));
        TracingNotifier.show(Notification::error("x", "y"));

        let shown = notifier.notifications();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].kind, NotificationKind::Warning);
    }
}
