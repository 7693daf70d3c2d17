//! The surfaces the timer drives but does not own.
//!
//! A host renders the badge, shows notifications and opens pages. The durable
//! tick source is a separate [`AlarmScheduler`], since it must outlive any
//! single host process.

use crate::error::Result;
use crate::pages::Page;
use crate::timer::Badge;

/// Presentation surfaces. Failures here are the host's to log; they never
/// roll back timer state.
pub trait Host {
    fn set_badge(&mut self, badge: &Badge);

    fn notify(&mut self, title: &str, message: &str);

    fn open_page(&mut self, page: Page);
}

/// Durable, named, recurring tick registrations.
///
/// A registration keeps firing after the process that created it exits, until
/// it is cancelled.
pub trait AlarmScheduler {
    /// Register `name` to fire every `interval_min` minutes, replacing any
    /// existing registration of the same name.
    fn schedule_recurring(&mut self, name: &str, interval_min: u32) -> Result<()>;

    /// Remove the registration. Returns whether one existed.
    fn cancel(&mut self, name: &str) -> Result<bool>;

    fn is_scheduled(&self, name: &str) -> Result<bool>;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn set_badge(&mut self, badge: &Badge) {
        (**self).set_badge(badge)
    }

    fn notify(&mut self, title: &str, message: &str) {
        (**self).notify(title, message)
    }

    fn open_page(&mut self, page: Page) {
        (**self).open_page(page)
    }
}
