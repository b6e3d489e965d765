//! Terminal styling helpers with NO_COLOR support.

use chrono::{Local, TimeZone};

/// Check if color output is enabled (respects `NO_COLOR` env var).
pub fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Terminal style helper that respects NO_COLOR.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    enabled: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

impl Style {
    pub fn new() -> Self {
        Self {
            enabled: color_enabled(),
        }
    }

    /// Colors when the config allows them and `NO_COLOR` is unset.
    pub fn with_config(color: bool) -> Self {
        Self {
            enabled: color && color_enabled(),
        }
    }

    /// Create a style with colors explicitly enabled (for tests).
    pub fn force_enabled() -> Self {
        Self { enabled: true }
    }

    /// Create a style with colors explicitly disabled.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn bold_start(&self) -> &'static str {
        if self.enabled {
            "\x1b[1m"
        } else {
            ""
        }
    }

    pub fn red_start(&self) -> &'static str {
        if self.enabled {
            "\x1b[91m"
        } else {
            ""
        }
    }

    pub fn yellow_start(&self) -> &'static str {
        if self.enabled {
            "\x1b[93m"
        } else {
            ""
        }
    }

    pub fn green_start(&self) -> &'static str {
        if self.enabled {
            "\x1b[92m"
        } else {
            ""
        }
    }

    pub fn cyan_start(&self) -> &'static str {
        if self.enabled {
            "\x1b[96m"
        } else {
            ""
        }
    }

    pub fn reset(&self) -> &'static str {
        if self.enabled {
            "\x1b[0m"
        } else {
            ""
        }
    }

    pub fn ok(&self, text: &str) -> String {
        format!("{}{text}{}", self.green_start(), self.reset())
    }

    pub fn error(&self, text: &str) -> String {
        format!("{}{text}{}", self.red_start(), self.reset())
    }

    pub fn warn(&self, text: &str) -> String {
        format!("{}{text}{}", self.yellow_start(), self.reset())
    }

    pub fn note(&self, text: &str) -> String {
        format!("{}{text}{}", self.cyan_start(), self.reset())
    }

    /// Bold cyan screen heading.
    pub fn title(&self, text: &str) -> String {
        format!(
            "{}{}{text}{}",
            self.bold_start(),
            self.cyan_start(),
            self.reset()
        )
    }

    /// Horizontal rule, 60 columns.
    pub fn hr(&self) -> String {
        self.note(&"─".repeat(60))
    }
}

/// Local `%Y-%m-%d %H:%M:%S` for a unix timestamp; the raw number if out of range.
pub fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// `Never` for an account that was never checked.
pub fn format_last_check(ts: Option<i64>) -> String {
    ts.map(format_timestamp)
        .unwrap_or_else(|| "Never".to_string())
}
