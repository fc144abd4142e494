//! Colored terminal output

use owo_colors::{OwoColorize, Style, colors::css};

/// Whether stdout accepts colored output.
fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Whether the terminal is too narrow for secondary columns.
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(w, _)| w.0 < 60)
}

/// Styles text for stdout, falling back to plain text.
pub trait Colorize {
    /// Green, for completed changes.
    fn success(&self) -> String;
    /// Orange, for no-ops the user may not expect.
    fn warning(&self) -> String;
    /// Blue, for codes.
    fn info(&self) -> String;
    /// Dimmed, for headings and secondary columns.
    fn dim(&self) -> String;
}

fn paint(text: &str, style: Style) -> String {
    if supports_color() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), Style::new().fg::<css::Green>())
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), Style::new().fg::<css::Orange>())
    }

    fn info(&self) -> String {
        paint(self.as_ref(), Style::new().fg::<css::LightBlue>())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), Style::new().dimmed())
    }
}
