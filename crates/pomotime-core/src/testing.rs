//! In-memory host for tests and dry runs.

use crate::host::Host;
use crate::pages::Page;
use crate::timer::Badge;

/// Records every surface call instead of performing it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub badges: Vec<Badge>,
    /// `(title, message)` pairs, in order.
    pub notifications: Vec<(String, String)>,
    pub pages: Vec<Page>,
}

impl Host for RecordingHost {
    fn set_badge(&mut self, badge: &Badge) {
        self.badges.push(badge.clone());
    }

    fn notify(&mut self, title: &str, message: &str) {
        self.notifications
            .push((title.to_string(), message.to_string()));
    }

    fn open_page(&mut self, page: Page) {
        self.pages.push(page);
    }
}
