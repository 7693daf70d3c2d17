//! Pages the core asks the host to open.
//!
//! The host decides how a page is shown. For hosts without a UI of their
//! own, [`Page::render_html`] produces a minimal standalone page.

use std::fmt;

use indoc::formatdoc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    /// Shown after a work session that is followed by a regular break.
    Complete,
    /// Shown after the work session that ends a cycle.
    LargeBreak,
    /// Shown after any break, inviting the next work session.
    Break,
    Settings,
}

impl Page {
    /// Stable page name, also used as the file stem.
    pub fn name(self) -> &'static str {
        match self {
            Page::Complete => "complete",
            Page::LargeBreak => "long-break",
            Page::Break => "break",
            Page::Settings => "settings",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.html", self.name())
    }

    fn heading(self) -> &'static str {
        match self {
            Page::Complete => "You have completed your work session.",
            Page::LargeBreak => "Time for a longer break! You've completed a full cycle.",
            Page::Break => "Break is over.",
            Page::Settings => "Timer settings",
        }
    }

    /// The CLI command that continues the cycle from this page.
    fn next_command(self) -> &'static str {
        match self {
            Page::Complete => "pomotime timer start-break",
            Page::LargeBreak => "pomotime timer start-large-break",
            Page::Break => "pomotime timer start-work",
            Page::Settings => "pomotime settings set <field> <minutes>",
        }
    }

    pub fn render_html(self) -> String {
        formatdoc! {r#"
            <!DOCTYPE html>
            <html lang="en">
            <head>
              <meta charset="utf-8">
              <title>Pomotime</title>
            </head>
            <body>
              <h2>{heading}</h2>
              <p>Continue with:</p>
              <pre>{command}</pre>
            </body>
            </html>
            "#,
            heading = self.heading(),
            command = self.next_command(),
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_break_page_keeps_legacy_name() {
        assert_eq!(Page::LargeBreak.file_name(), "long-break.html");
        assert_eq!(
            serde_json::to_string(&Page::LargeBreak).unwrap(),
            "\"large-break\""
        );
    }

    #[test]
    fn rendered_page_points_at_next_command() {
        let html = Page::Complete.render_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("pomotime timer start-break"));
    }
}
