//! Notification center that writes notifications to the log.

use super::{NotificationCenter, NotificationPermission};
use log::info;

/// Headless notification sink.
///
/// Starts in `Default` permission state; a request grants unless the
/// center was built with [`LogNotificationCenter::denying`].
#[derive(Debug)]
pub struct LogNotificationCenter {
    permission: NotificationPermission,
    grant_on_request: bool,
    delivered: Vec<(String, String)>,
}

impl Default for LogNotificationCenter {
    fn default() -> Self {
        Self {
            permission: NotificationPermission::Default,
            grant_on_request: true,
            delivered: Vec::new(),
        }
    }
}

impl LogNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A center whose permission requests are always refused.
    pub fn denying() -> Self {
        Self {
            grant_on_request: false,
            ..Self::default()
        }
    }

    /// `(title, body)` pairs delivered so far.
    pub fn delivered(&self) -> &[(String, String)] {
        &self.delivered
    }
}

impl NotificationCenter for LogNotificationCenter {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) -> NotificationPermission {
        if self.permission == NotificationPermission::Default {
            self.permission = if self.grant_on_request {
                NotificationPermission::Granted
            } else {
                NotificationPermission::Denied
            };
        }
        self.permission
    }

    fn notify(&mut self, title: &str, body: &str) {
        info!(
            "event=notification module=host title_chars={} body_chars={}",
            title.chars().count(),
            body.chars().count()
        );
        self.delivered.push((title.to_string(), body.to_string()));
    }
}
