//! `doctor`: where each setting resolves from and which helper programs are on PATH.
//! Setting values are never printed.

use std::path::{Path, PathBuf};

use crate::color::{color_enabled_stderr, paint};
use crate::config::{Settings, ALL_KEYS};

/// Programs the radio and virt menus shell out to.
pub const HELPERS: &[&str] = &["virsh", "virt-manager", "ps", "vlc", "killall"];

const LABEL_WIDTH: usize = 16;
const VALUE_COL: usize = 44;

fn tilde(path: &Path, home: Option<&Path>) -> String {
    let shown = path.display().to_string();
    match home.map(|h| h.display().to_string()) {
        Some(h) if !h.is_empty() && shown.starts_with(&h) => format!("~{}", &shown[h.len()..]),
        _ => shown,
    }
}

fn row(use_color: bool, label: &str, value: &str, ok: bool) -> String {
    let pad = " ".repeat(VALUE_COL.saturating_sub(value.chars().count()).max(1));
    let (icon, text) = if ok { ("✅", "found") } else { ("❌", "missing") };
    let status = paint(use_color, if ok { "\x1b[32m" } else { "\x1b[31m" }, &format!("{icon} {text}"));
    format!(
        "  {:width$} {}{pad} {status}",
        label,
        paint(use_color, "\x1b[34;1m", value),
        width = LABEL_WIDTH
    )
}

/// Doctor output lines (without trailing newlines).
pub fn report(settings: &Settings, cache_dir: &Path, use_color: bool) -> Vec<String> {
    let home: Option<PathBuf> = home::home_dir();
    let mut out = vec![
        "argos-menus doctor".to_string(),
        String::new(),
        format!("  version: v{}", env!("CARGO_PKG_VERSION")),
        format!(
            "  build:   {} ({}, {})",
            env!("ARGOS_MENUS_BUILD_DATE"),
            env!("ARGOS_MENUS_BUILD_PROFILE"),
            env!("ARGOS_MENUS_BUILD_TARGET"),
        ),
        format!("  rustc:   {}", env!("ARGOS_MENUS_BUILD_RUSTC")),
        String::new(),
    ];

    let config_dir = settings.config_dir();
    out.push(row(use_color, "config dir:", &tilde(config_dir, home.as_deref()), config_dir.is_dir()));
    out.push(row(use_color, "cache dir:", &tilde(cache_dir, home.as_deref()), cache_dir.is_dir()));
    if let Some(reason) = settings.keystore_error() {
        out.push(row(use_color, "keys.json:", reason, false));
    }
    out.push(String::new());

    for key in ALL_KEYS {
        let (value, ok) = match settings.lookup(key) {
            Some((_, source)) => (format!("from {source}"), true),
            None => ("(unset)".to_string(), false),
        };
        out.push(row(use_color, key.env, &value, ok));
    }
    out.push(String::new());

    for program in HELPERS {
        let (value, ok) = match which::which(program) {
            Ok(p) => (tilde(&p, home.as_deref()), true),
            Err(_) => ("(not on PATH)".to_string(), false),
        };
        out.push(row(use_color, program, &value, ok));
    }
    out.push(String::new());
    out.push("doctor: completed diagnostics.".to_string());
    out
}

pub fn run_doctor(settings: &Settings, cache_dir: &Path) {
    for line in report(settings, cache_dir, color_enabled_stderr()) {
        eprintln!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_tilde() {
        let home = Path::new("/home/u");
        assert_eq!(tilde(Path::new("/home/u/.cache/x"), Some(home)), "~/.cache/x");
        assert_eq!(tilde(Path::new("/opt/x"), Some(home)), "/opt/x");
        assert_eq!(tilde(Path::new("/opt/x"), None), "/opt/x");
    }

    #[test]
    fn test_report_names_sources_not_values() {
        let mut env = BTreeMap::new();
        env.insert("JIRA_AUTH".to_string(), "me:s3cret".to_string());
        let mut ks = BTreeMap::new();
        ks.insert("bitbucket.host".to_string(), "https://bb.example".to_string());
        let settings = Settings::from_parts(env, ks, BTreeMap::new());
        let td = tempfile::tempdir().expect("tmpdir");

        let lines = report(&settings, td.path(), false);
        let text = lines.join("\n");
        assert!(!text.contains("s3cret"));
        assert!(!text.contains("bb.example"));
        let jira_auth = lines.iter().find(|l| l.trim_start().starts_with("JIRA_AUTH")).unwrap();
        assert!(jira_auth.contains("from environment"));
        assert!(jira_auth.contains("found"));
        let bb_host = lines.iter().find(|l| l.trim_start().starts_with("BITBUCKET_HOST")).unwrap();
        assert!(bb_host.contains("from keys.json"));
        let team = lines.iter().find(|l| l.trim_start().starts_with("JIRA_TEAM")).unwrap();
        assert!(team.contains("(unset)") && team.contains("missing"));
        assert_eq!(lines.last().map(String::as_str), Some("doctor: completed diagnostics."));
    }

    #[test]
    fn test_row_plain_alignment() {
        let r = row(false, "cache dir:", "/tmp/c", true);
        assert!(r.starts_with("  cache dir:       /tmp/c"));
        assert!(r.ends_with("✅ found"));
        assert!(!r.contains('\x1b'));
    }
}
