//! apidl CLI UI primitives.

use std::path::Path;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal palette.
pub mod colors {
    use console::Color;

    pub const CYAN: Color = Color::Color256(51);
    pub const MAGENTA: Color = Color::Color256(201);
    pub const GREEN: Color = Color::Color256(82);
    pub const DIM: Color = Color::Color256(240);
}

pub mod symbols {
    pub const DIAMOND: &str = "\u{25C6}"; // ◆
    pub const DIAMOND_OUTLINE: &str = "\u{25C7}"; // ◇
    pub const TARGET_FILLED: &str = "\u{25C9}"; // ◉
    pub const TRIANGLE: &str = "\u{25B8}"; // ▸
    pub const DOT: &str = "\u{00B7}"; // ·
}

/// Clickable `path:line` (OSC 8 hyperlink).
pub fn file_link(path: &Path, line: usize) -> String {
    let abs_path = std::fs::canonicalize(path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string());
    let uri = format!("file://{}#{}", abs_path, line);
    let display = format!("{}:{}", path.display(), line);
    format!("\x1b]8;;{}\x07{}\x1b]8;;\x07", uri, display)
}

pub fn success(msg: &str) {
    println!("  {} {}", style(symbols::TARGET_FILLED).fg(colors::GREEN), msg);
}

pub fn error(msg: &str) {
    eprintln!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::MAGENTA),
        style(msg).fg(colors::MAGENTA)
    );
}

pub fn info(msg: &str) {
    println!("  {} {}", style(symbols::DIAMOND_OUTLINE).fg(colors::CYAN), msg);
}

pub fn dim(msg: &str) {
    println!("  {}", style(msg).fg(colors::DIM));
}

/// One line per validated file: `▸ name  N types · M routes`.
pub fn api_line(name: &str, types: usize, routes: usize) {
    println!(
        "  {}   {:24} {} types {} {} routes",
        style(symbols::TRIANGLE).fg(colors::CYAN),
        style(name).bold(),
        types,
        symbols::DOT,
        routes
    );
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner()
        .tick_chars("\u{25CE}\u{25C9}\u{25CE}\u{25C9}") // ◎◉◎◉
        .template("  {spinner:.cyan} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(150));
    pb
}

/// `── label ──────` separator between watch passes.
pub fn rule(label: &str) {
    let width: usize = 55;
    let tail = width.saturating_sub(label.chars().count() + 4);
    println!(
        "  {} {} {}",
        style("\u{2500}\u{2500}").fg(colors::DIM),
        style(label).fg(colors::CYAN).bold(),
        style("\u{2500}".repeat(tail)).fg(colors::DIM)
    );
}

pub fn timing(label: &str, duration_ms: u128) {
    println!(
        "  {} {} in {}ms",
        style(symbols::DIAMOND_OUTLINE).fg(colors::CYAN),
        label,
        duration_ms
    );
}

/// Summary printed when any file failed to validate.
pub fn failed_summary(failed: usize, total: usize) {
    eprintln!();
    eprintln!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::MAGENTA).bold(),
        style(format!("{failed} of {total} api files failed validation"))
            .fg(colors::MAGENTA)
            .bold()
    );
    eprintln!();
}
