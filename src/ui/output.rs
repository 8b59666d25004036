//! CLI messages. Styling is dropped when the target stream is not a
//! terminal; `AIM_QUIET=1` silences everything except warnings and errors.

use std::sync::OnceLock;
use owo_colors::{OwoColorize, Style};
use crate::ui::Icons;

static QUIET: OnceLock<bool> = OnceLock::new();

pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("AIM_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// What a piece of text means, not how it looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Header,
    Success,
    Error,
    Warn,
    Accent,
    Label,
}

impl Tone {
    fn style(self, colored: bool) -> Style {
        if !colored {
            return Style::new();
        }
        match self {
            Tone::Header => Style::new().cyan().bold(),
            Tone::Success => Style::new().green().bold(),
            Tone::Error => Style::new().red().bold(),
            Tone::Warn => Style::new().yellow().bold(),
            Tone::Accent => Style::new().magenta(),
            Tone::Label => Style::new().white().dimmed(),
        }
    }

    /// Style `text` for stdout
    pub fn paint(self, text: &str) -> String {
        text.style(self.style(console::colors_enabled())).to_string()
    }

    /// Style `text` for stderr
    pub fn paint_err(self, text: &str) -> String {
        text.style(self.style(console::colors_enabled_stderr())).to_string()
    }
}

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::ROCKET, Tone::Header.paint(text));
}

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CHECK, Tone::Success.paint(label));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, Tone::Error.paint_err(label));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, Tone::Warn.paint_err(label));
}

pub fn info(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!(
        "{} {}: {}",
        Tone::Accent.paint(Icons::INFO),
        Tone::Label.paint(label),
        value
    );
}
