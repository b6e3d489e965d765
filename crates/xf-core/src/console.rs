//! Output surface shared by the menus and batch commands.

use std::io::Write;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use xf_protocol::{Attempt, AttemptOutcome};

use crate::progress::ProgressBar;
use crate::style::Style;

/// Styled line output plus progress bars. Screen clearing and bars are only
/// drawn when `interactive` (stdout is a terminal).
pub struct Console<W: Write> {
    out: W,
    pub style: Style,
    interactive: bool,
    bar_width: usize,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, style: Style, interactive: bool, bar_width: usize) -> Self {
        Self {
            out,
            style,
            interactive,
            bar_width,
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", text.as_ref());
        let _ = self.out.flush();
    }

    pub fn blank(&mut self) {
        self.line("");
    }

    pub fn hr(&mut self) {
        let rule = self.style.hr();
        self.line(rule);
    }

    pub fn title(&mut self, text: &str) {
        let title = self.style.title(text);
        self.line(title);
    }

    pub fn ok(&mut self, text: &str) {
        let s = self.style.ok(text);
        self.line(s);
    }

    pub fn error(&mut self, text: &str) {
        let s = self.style.error(text);
        self.line(s);
    }

    pub fn warn(&mut self, text: &str) {
        let s = self.style.warn(text);
        self.line(s);
    }

    pub fn note(&mut self, text: &str) {
        let s = self.style.note(text);
        self.line(s);
    }

    pub fn clear(&mut self) {
        if self.interactive {
            let _ = queue!(self.out, Clear(ClearType::All), MoveTo(0, 0));
            let _ = self.out.flush();
        }
    }

    /// A bar using the configured width.
    pub fn progress(&self, prefix: &str) -> ProgressBar {
        ProgressBar::new(prefix, self.bar_width, self.interactive)
    }

    /// A bar with an explicit width.
    pub fn progress_with_width(&self, prefix: &str, width: usize) -> ProgressBar {
        ProgressBar::new(prefix, width, self.interactive)
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Report one failed candidate endpoint.
    pub fn attempt_failed(&mut self, attempt: &Attempt, client: &str) {
        let saved = attempt
            .debug_file
            .as_ref()
            .map(|p| format!(" Saved debug to: {}", p.display()))
            .unwrap_or_default();
        let text = match &attempt.outcome {
            AttemptOutcome::Transport(e) => format!("  Error ({client}): {e}"),
            AttemptOutcome::Status(code) => format!("  HTTP status {code} from {client}.{saved}"),
            AttemptOutcome::BadBody(reason) => format!("  Unusable response: {reason}.{saved}"),
        };
        self.error(&text);
    }
}
