#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Settings variables scrubbed from every child so the developer's own
/// credentials never leak into a test run.
const SCRUBBED: &[&str] = &[
    "BITBUCKET_HOST",
    "BITBUCKET_AUTH",
    "JIRA_HOST",
    "JIRA_AUTH",
    "JIRA_TEAM",
    "JIRA_PROJECT",
    "ARGOS_MENUS_LOG",
    "ARGOS_MENUS_COLOR",
    "ARGOS_MENUS_VIRSH_URI",
    "ARGOS_MENUS_CONFIG_DIR",
    "ARGOS_MENUS_CACHE_DIR",
    "XDG_CONFIG_HOME",
    "XDG_CACHE_HOME",
];

/// An isolated HOME, config dir, cache dir and PATH prefix for one test.
pub struct Sandbox {
    pub root: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create sandbox");
        for d in ["home", "config", "cache", "bin"] {
            fs::create_dir_all(root.path().join(d)).expect("sandbox dir");
        }
        Self { root }
    }

    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.path().join("config")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.path().join("cache")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    /// Install an executable shell script named `name` on the sandbox PATH.
    #[cfg(unix)]
    pub fn fake_program(&self, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = self.bin_dir().join(name);
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write fake program");
        let mut perm = fs::metadata(&path).expect("stat").permissions();
        perm.set_mode(0o755);
        fs::set_permissions(&path, perm).expect("chmod");
        path
    }

    pub fn write_keystore(&self, json: &str) {
        fs::write(self.config_dir().join("keys.json"), json).expect("write keys.json");
    }

    pub fn command_at(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        for key in SCRUBBED {
            cmd.env_remove(key);
        }
        let path = format!("{}:/usr/bin:/bin", self.bin_dir().display());
        cmd.env("HOME", self.home())
            .env("PATH", path)
            .env("NO_COLOR", "1")
            .env("ARGOS_MENUS_CONFIG_DIR", self.config_dir())
            .env("ARGOS_MENUS_CACHE_DIR", self.cache_dir());
        cmd
    }

    pub fn command(&self) -> Command {
        self.command_at(Path::new(env!("CARGO_BIN_EXE_argos-menus")))
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("failed to run argos-menus")
    }
}

pub fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

pub fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

pub fn describe(out: &Output) -> String {
    format!(
        "status: {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        stdout(out),
        stderr(out)
    )
}
