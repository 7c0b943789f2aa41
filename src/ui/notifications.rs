//! Short-lived user notifications shown at the bottom of the window

use std::time::{Duration, Instant};

use eframe::egui;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A single notification
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    shown_at: Instant,
}

/// Queue of notifications that expire after a fixed time
#[derive(Debug)]
pub struct Notifications {
    items: Vec<Notice>,
    ttl: Duration,
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: Vec::new(),
            ttl,
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message.into(), NoticeLevel::Info);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message.into(), NoticeLevel::Error);
    }

    fn push(&mut self, message: String, level: NoticeLevel) {
        self.items.push(Notice {
            message,
            level,
            shown_at: Instant::now(),
        });
    }

    /// Drop notifications older than the time-to-live
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.items
            .retain(|notice| now.saturating_duration_since(notice.shown_at) < ttl);
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[allow(dead_code)]
    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    /// Show the notification panel, if there is anything to show
    pub fn show(&self, ctx: &egui::Context) {
        if self.items.is_empty() {
            return;
        }

        egui::TopBottomPanel::bottom("notifications").show(ctx, |ui| {
            for notice in &self.items {
                let text = egui::RichText::new(&notice.message);
                match notice.level {
                    NoticeLevel::Info => ui.label(text),
                    NoticeLevel::Error => ui.label(text.color(ui.visuals().error_fg_color)),
                };
            }
        });
        // Repaint so expired notices disappear without user input
        ctx.request_repaint_after(Duration::from_millis(500));
    }
}

/// Human readable size, rounded down to whole units (e.g. "3 KB")
pub fn display_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_size() {
        assert_eq!(display_size(0), "0 bytes");
        assert_eq!(display_size(1023), "1023 bytes");
        assert_eq!(display_size(1024), "1 KB");
        assert_eq!(display_size(5000), "4 KB");
        assert_eq!(display_size(3 * 1024 * 1024 + 7), "3 MB");
        assert_eq!(display_size(2 * 1024 * 1024 * 1024), "2 GB");
    }

    #[test]
    fn test_prune_expires_old_notices() {
        let mut notifications = Notifications::new(Duration::from_secs(4));
        notifications.info("saved");
        notifications.error("failed");
        assert_eq!(notifications.iter().count(), 2);

        notifications.prune(Instant::now());
        assert_eq!(notifications.iter().count(), 2);

        notifications.prune(Instant::now() + Duration::from_secs(5));
        assert!(notifications.is_empty());
    }
}
