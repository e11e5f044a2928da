#![allow(clippy::module_name_repetitions)]
//! Host URLs and credentials for the plugins.
//!
//! Each setting is looked up, first hit wins, in:
//! 1) the process environment (`JIRA_HOST`, ...)
//! 2) the JSON key-store `<config-dir>/keys.json` (flat object, dotted keys: `jira.host`)
//! 3) `export NAME="value"` lines in `~/.bash*` dotfiles

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::errors::MenuError;

pub const KEYSTORE_FILE: &str = "keys.json";

/// A setting name in both of its spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub env: &'static str,
    pub store: &'static str,
}

pub const BITBUCKET_HOST: Key = Key {
    env: "BITBUCKET_HOST",
    store: "bitbucket.host",
};
pub const BITBUCKET_AUTH: Key = Key {
    env: "BITBUCKET_AUTH",
    store: "bitbucket.auth",
};
pub const JIRA_HOST: Key = Key {
    env: "JIRA_HOST",
    store: "jira.host",
};
pub const JIRA_AUTH: Key = Key {
    env: "JIRA_AUTH",
    store: "jira.auth",
};
pub const JIRA_TEAM: Key = Key {
    env: "JIRA_TEAM",
    store: "jira.team_filter",
};
pub const JIRA_PROJECT: Key = Key {
    env: "JIRA_PROJECT",
    store: "jira.project",
};

pub const ALL_KEYS: &[Key] = &[
    BITBUCKET_HOST,
    BITBUCKET_AUTH,
    JIRA_HOST,
    JIRA_AUTH,
    JIRA_TEAM,
    JIRA_PROJECT,
];

/// Where a resolved setting came from (reported by `doctor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Env,
    KeyStore,
    Dotfile,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Env => "environment",
            Source::KeyStore => KEYSTORE_FILE,
            Source::Dotfile => "~/.bash* dotfile",
        })
    }
}

/// `user:token` pair for HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub token: String,
}

impl BasicAuth {
    /// Split at the first `:`; tokens may contain further colons.
    pub fn parse(name: &str, raw: &str) -> Result<Self, MenuError> {
        match raw.trim().split_once(':') {
            Some((user, token)) if !user.is_empty() && !token.is_empty() => Ok(Self {
                user: user.to_string(),
                token: token.to_string(),
            }),
            _ => Err(MenuError::InvalidSetting {
                name: name.to_string(),
                reason: "expected user:token".to_string(),
            }),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Normalize a host setting: must be an http(s) URL; trailing `/` removed.
pub fn parse_host(name: &str, raw: &str) -> Result<String, MenuError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| MenuError::InvalidSetting {
        name: name.to_string(),
        reason,
    };
    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Default, Clone)]
pub struct Settings {
    env: BTreeMap<String, String>,
    keystore: BTreeMap<String, String>,
    dotfiles: BTreeMap<String, String>,
    config_dir: PathBuf,
    /// Why `keys.json` could not be read. Reported only when a lookup needs it.
    keystore_error: Option<String>,
}

impl Settings {
    /// Snapshot the process environment, key-store and dotfiles. An unreadable
    /// key-store does not fail the load; `require` reports it for settings
    /// the environment does not provide.
    pub fn load(config_dir: &Path) -> Self {
        let env = ALL_KEYS
            .iter()
            .filter_map(|k| {
                std::env::var(k.env)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (k.env.to_string(), v))
            })
            .collect();
        let (keystore, keystore_error) = match read_keystore(&config_dir.join(KEYSTORE_FILE)) {
            Ok(ks) => (ks, None),
            Err(e) => {
                tracing::warn!(error = %e, "key-store unreadable");
                (BTreeMap::new(), Some(e.to_string()))
            }
        };
        let dotfiles = match home::home_dir() {
            Some(home) => read_dotfiles(&home),
            None => BTreeMap::new(),
        };
        Self {
            env,
            keystore,
            dotfiles,
            config_dir: config_dir.to_path_buf(),
            keystore_error,
        }
    }

    pub fn from_parts(
        env: BTreeMap<String, String>,
        keystore: BTreeMap<String, String>,
        dotfiles: BTreeMap<String, String>,
    ) -> Self {
        Self {
            env,
            keystore,
            dotfiles,
            config_dir: PathBuf::new(),
            keystore_error: None,
        }
    }

    pub fn keystore_error(&self) -> Option<&str> {
        self.keystore_error.as_deref()
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn lookup(&self, key: &Key) -> Option<(String, Source)> {
        if let Some(v) = self.env.get(key.env) {
            return Some((v.clone(), Source::Env));
        }
        if let Some(v) = self.keystore.get(key.store) {
            return Some((v.clone(), Source::KeyStore));
        }
        self.dotfiles
            .get(key.env)
            .map(|v| (v.clone(), Source::Dotfile))
    }

    pub fn get(&self, key: &Key) -> Option<String> {
        self.lookup(key)
            .map(|(v, _)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, key: &Key) -> Result<String, MenuError> {
        if let Some(reason) = &self.keystore_error {
            if !self.env.contains_key(key.env) {
                return Err(MenuError::Parse(reason.clone()));
            }
        }
        self.get(key)
            .ok_or_else(|| MenuError::MissingSetting(key.env.to_string()))
    }

    pub fn require_host(&self, key: &Key) -> Result<String, MenuError> {
        parse_host(key.env, &self.require(key)?)
    }

    pub fn require_auth(&self, key: &Key) -> Result<BasicAuth, MenuError> {
        BasicAuth::parse(key.env, &self.require(key)?)
    }
}

/// Read the flat JSON key-store. A missing file is an empty store; non-string
/// values are ignored.
pub fn read_keystore(path: &Path) -> Result<BTreeMap<String, String>, MenuError> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
        MenuError::Parse(format!("{}: {e}", path.display()))
    })?;
    let obj = value.as_object().ok_or_else(|| {
        MenuError::Parse(format!("{}: expected a JSON object", path.display()))
    })?;
    Ok(obj
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect())
}

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?([A-Z][A-Z0-9_]*)=").expect("valid assignment regex")
});

/// Extract assignments for known setting names from shell dotfile text.
/// Later assignments win, matching what sourcing the file would do.
pub fn parse_dotfile_assignments(text: &str, into: &mut BTreeMap<String, String>) {
    for line in text.lines() {
        let Some(caps) = ASSIGNMENT.captures(line) else {
            continue;
        };
        let name = &caps[1];
        if !ALL_KEYS.iter().any(|k| k.env == name) {
            continue;
        }
        let assignment = line.trim_start();
        let assignment = assignment
            .strip_prefix("export")
            .map(str::trim_start)
            .unwrap_or(assignment);
        match dotenvy::from_read_iter(assignment.as_bytes()).next() {
            Some(Ok((k, v))) => {
                into.insert(k, v);
            }
            Some(Err(e)) => {
                tracing::debug!(name, error = %e, "skipping unparsable dotfile assignment");
            }
            None => {}
        }
    }
}

/// Scan `~/.bash*` files (sorted by name) for setting assignments.
pub fn read_dotfiles(home: &Path) -> BTreeMap<String, String> {
    let mut files: Vec<PathBuf> = match fs::read_dir(home) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with(".bash"))
                        .unwrap_or(false)
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();

    let mut out = BTreeMap::new();
    for f in files {
        match fs::read(&f) {
            Ok(bytes) => parse_dotfile_assignments(&String::from_utf8_lossy(&bytes), &mut out),
            Err(e) => tracing::debug!(path = %f.display(), error = %e, "unreadable dotfile"),
        }
    }
    out
}
