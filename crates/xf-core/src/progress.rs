//! Single-line progress bars for downloads, parsing and file writes.

use std::io::Write;

const SPINNER: [char; 4] = ['-', '\\', '|', '/'];
const FILL: char = '█';

/// Render a bar for a known total, e.g. `\r  Saving |████------|  40.00% `.
pub fn render_bar(count: u64, total: u64, prefix: &str, suffix: &str, width: usize) -> String {
    let proportion = if total == 0 {
        1.0
    } else {
        (count as f64 / total as f64).clamp(0.0, 1.0)
    };
    let filled = (width as f64 * proportion) as usize;
    let bar: String = std::iter::repeat(FILL)
        .take(filled)
        .chain(std::iter::repeat('-').take(width - filled))
        .collect();
    format!("\r{prefix} |{bar}| {:6.2}% {suffix}", proportion * 100.0)
}

/// Render the unknown-total form: a spinner and the byte count.
pub fn render_spinner(count: u64, prefix: &str, suffix: &str) -> String {
    let s = SPINNER[(count % SPINNER.len() as u64) as usize];
    format!("\r{prefix} {s} {count} bytes {suffix}")
}

/// Progress state for one operation. Draws nothing when disabled (non-TTY).
#[derive(Debug)]
pub struct ProgressBar {
    prefix: String,
    width: usize,
    enabled: bool,
    drawn: bool,
    finished: bool,
}

impl ProgressBar {
    pub fn new(prefix: impl Into<String>, width: usize, enabled: bool) -> Self {
        Self {
            prefix: prefix.into(),
            width: width.max(1),
            enabled,
            drawn: false,
            finished: false,
        }
    }

    /// Redraw. With a known total the line is terminated once `count >= total`.
    pub fn update<W: Write + ?Sized>(&mut self, out: &mut W, count: u64, total: Option<u64>) {
        if !self.enabled || self.finished {
            return;
        }
        let line = match total {
            Some(total) if total > 0 => render_bar(count, total, &self.prefix, "", self.width),
            _ => render_spinner(count, &self.prefix, ""),
        };
        let _ = write!(out, "{line}");
        self.drawn = true;
        if let Some(total) = total.filter(|t| *t > 0) {
            if count >= total {
                let _ = writeln!(out);
                self.finished = true;
            }
        }
        let _ = out.flush();
    }

    /// End the line if a bar is still open.
    pub fn finish<W: Write + ?Sized>(&mut self, out: &mut W) {
        if self.enabled && self.drawn && !self.finished {
            let _ = writeln!(out);
            let _ = out.flush();
        }
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_half_full() {
        assert_eq!(
            render_bar(5, 10, "  Saving", "", 10),
            "\r  Saving |█████-----|  50.00% "
        );
    }

    #[test]
    fn bar_clamps_overflow() {
        assert_eq!(
            render_bar(20, 10, "p", "s", 4),
            "\rp |████| 100.00% s"
        );
    }

    #[test]
    fn bar_floors_partial_cells() {
        // 1/3 of 10 cells = 3.33 -> 3
        assert_eq!(render_bar(1, 3, "p", "", 10), "\rp |███-------|  33.33% ");
    }

    #[test]
    fn spinner_cycles() {
        assert_eq!(render_spinner(0, "  Downloading", ""), "\r  Downloading - 0 bytes ");
        assert_eq!(render_spinner(5, "d", ""), "\rd \\ 5 bytes ");
        assert_eq!(render_spinner(6, "d", ""), "\rd | 6 bytes ");
    }

    #[test]
    fn progress_terminates_line_once() {
        let mut out = Vec::new();
        let mut bar = ProgressBar::new("p", 4, true);
        bar.update(&mut out, 2, Some(4));
        bar.update(&mut out, 4, Some(4));
        bar.update(&mut out, 4, Some(4));
        bar.finish(&mut out);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with("100.00% \n"));
    }

    #[test]
    fn finish_closes_spinner_line() {
        let mut out = Vec::new();
        let mut bar = ProgressBar::new("p", 4, true);
        bar.update(&mut out, 10, None);
        bar.finish(&mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "\rp | 10 bytes \n");
    }

    #[test]
    fn disabled_draws_nothing() {
        let mut out = Vec::new();
        let mut bar = ProgressBar::new("p", 4, false);
        bar.update(&mut out, 1, Some(2));
        bar.finish(&mut out);
        assert!(out.is_empty());
    }
}
