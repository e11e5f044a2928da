#![allow(clippy::module_name_repetitions)]
//! Color mode for stderr diagnostics.
//!
//! Stdout carries Argos markup and is never colored. Only stderr output
//! (tracing logs, doctor and cache-clear reports) honours the mode resolved here:
//! NO_COLOR first, then the `--color` flag, then `ARGOS_MENUS_COLOR`, then TTY detection.

use clap::ValueEnum;
use once_cell::sync::OnceCell;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

static COLOR_MODE: OnceCell<ColorMode> = OnceCell::new();

pub fn set_color_mode(mode: ColorMode) {
    let _ = COLOR_MODE.set(mode);
}

fn parse_color_mode(s: &str) -> Option<ColorMode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "auto" => Some(ColorMode::Auto),
        "always" | "on" | "true" | "yes" => Some(ColorMode::Always),
        "never" | "off" | "false" | "no" => Some(ColorMode::Never),
        _ => None,
    }
}

fn resolve(no_color: bool, cli: Option<ColorMode>, env: Option<&str>, is_tty: bool) -> bool {
    if no_color {
        return false;
    }
    let mode = cli
        .or_else(|| env.and_then(parse_color_mode))
        .unwrap_or(ColorMode::Auto);
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_tty,
    }
}

pub fn color_enabled_stderr() -> bool {
    // Per https://no-color.org/
    let no_color = std::env::var_os("NO_COLOR").is_some();
    let env_pref = std::env::var("ARGOS_MENUS_COLOR").ok();
    resolve(
        no_color,
        COLOR_MODE.get().copied(),
        env_pref.as_deref(),
        atty::is(atty::Stream::Stderr),
    )
}

/// Wrap string with ANSI color code when enabled; otherwise return unchanged.
pub fn paint(enabled: bool, code: &str, s: &str) -> String {
    if enabled {
        format!("{code}{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

pub fn log_info_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[36;1m", msg));
}

pub fn log_warn_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[33m", msg));
}

pub fn log_error_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[31;1m", msg));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_wins_over_everything() {
        assert!(!resolve(true, Some(ColorMode::Always), Some("always"), true));
    }

    #[test]
    fn test_cli_flag_overrides_env() {
        assert!(resolve(false, Some(ColorMode::Always), Some("never"), false));
        assert!(!resolve(false, Some(ColorMode::Never), Some("always"), true));
    }

    #[test]
    fn test_env_then_tty() {
        assert!(resolve(false, None, Some("on"), false));
        assert!(!resolve(false, None, Some("garbage"), false));
        assert!(resolve(false, None, None, true));
    }

    #[test]
    fn test_paint() {
        assert_eq!(paint(false, "\x1b[31m", "x"), "x");
        assert_eq!(paint(true, "\x1b[31m", "x"), "\x1b[31mx\x1b[0m");
    }
}
