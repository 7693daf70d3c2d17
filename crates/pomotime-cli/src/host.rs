//! Desktop surfaces for the CLI.
//!
//! - Badge: persisted by the driver; shown by `timer status`, logged here
//! - Notifications: stderr, plus a desktop notification when enabled
//! - Pages: rendered to `<data_dir>/pages/` and opened in the browser when enabled

use std::path::PathBuf;

use notify_rust::Notification;
use pomotime_core::{Badge, Config, Host, Page};
use tracing::{debug, warn};

pub struct DesktopHost {
    config: Config,
    pages_dir: PathBuf,
}

impl DesktopHost {
    pub fn new(config: Config, data_dir: PathBuf) -> Self {
        Self {
            config,
            pages_dir: data_dir.join("pages"),
        }
    }

    fn write_page(&self, page: Page) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.pages_dir)?;
        let path = self.pages_dir.join(page.file_name());
        std::fs::write(&path, page.render_html())?;
        Ok(path)
    }
}

impl Host for DesktopHost {
    fn set_badge(&mut self, badge: &Badge) {
        debug!(
            text = %badge.text,
            color = %badge.background_color,
            "badge"
        );
    }

    fn notify(&mut self, title: &str, message: &str) {
        eprintln!("{title}: {message}");
        if !self.config.notifications.enabled {
            return;
        }
        if let Err(e) = Notification::new()
            .summary(title)
            .body(message)
            .appname("pomotime")
            .show()
        {
            warn!(error = %e, "desktop notification failed");
        }
    }

    fn open_page(&mut self, page: Page) {
        let path = match self.write_page(page) {
            Ok(path) => path,
            Err(e) => {
                warn!(%page, error = %e, "failed to write page");
                return;
            }
        };
        if !self.config.pages.open_in_browser {
            debug!(%page, path = %path.display(), "page written, not opening");
            return;
        }
        if let Err(e) = open::that(&path) {
            warn!(%page, error = %e, "failed to open page");
        }
    }
}
