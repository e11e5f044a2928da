use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_ENV: &str = "ARGOS_MENUS_CONFIG_DIR";
pub const CACHE_DIR_ENV: &str = "ARGOS_MENUS_CACHE_DIR";

const APP_DIR: &str = "argos-menus";

fn non_empty_env(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Resolve an application directory:
/// - explicit override env (used verbatim)
/// - `$<xdg>/argos-menus`
/// - `~/<fallback>/argos-menus`
fn app_dir(override_env: &str, xdg_env: &str, fallback: &str) -> PathBuf {
    if let Some(p) = non_empty_env(override_env) {
        return p;
    }
    if let Some(p) = non_empty_env(xdg_env) {
        return p.join(APP_DIR);
    }
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(fallback)
        .join(APP_DIR)
}

pub fn default_config_dir() -> PathBuf {
    app_dir(CONFIG_DIR_ENV, "XDG_CONFIG_HOME", ".config")
}

pub fn default_cache_dir() -> PathBuf {
    app_dir(CACHE_DIR_ENV, "XDG_CACHE_HOME", ".cache")
}

/// Create parent directories of `p` as needed.
pub fn ensure_parent_dir(p: &Path) -> std::io::Result<()> {
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
