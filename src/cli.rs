use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use argos_menus::{ColorMode, Plugin};

#[derive(Parser, Debug)]
#[command(
    name = "argos-menus",
    version,
    about = "Argos/BitBar menus for Bitbucket, Jira, internet radio and libvirt VMs."
)]
pub(crate) struct Cli {
    /// Log debug diagnostics to stderr (ARGOS_MENUS_LOG overrides the filter)
    #[arg(long, global = true)]
    pub(crate) debug: bool,

    /// Colorize stderr output: auto|always|never
    #[arg(long = "color", value_enum, global = true)]
    pub(crate) color: Option<ColorMode>,

    /// Directory holding icon caches (overrides ARGOS_MENUS_CACHE_DIR)
    #[arg(long = "cache-dir", global = true)]
    pub(crate) cache_dir: Option<PathBuf>,

    /// Directory holding keys.json and stations.yaml (overrides ARGOS_MENUS_CONFIG_DIR)
    #[arg(long = "config-dir", global = true)]
    pub(crate) config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Open pull requests you authored or review
    Bitbucket,
    /// Unresolved Jira issues assigned to you
    Jira,
    /// Issues of a saved Jira filter, grouped by assignee
    #[command(name = "jira-team", alias = "jirateam")]
    JiraTeam,
    /// Internet radio stations played through VLC
    Radio,
    /// libvirt virtual machines
    #[command(alias = "virt-manager")]
    Virt,
    /// Delete on-disk icon caches
    CacheClear,
    /// Report configuration sources and helper programs
    Doctor,
}

/// Argos runs a plugin file directly. When argv[0] names a plugin
/// (`bitbucket.1c.300s+`, a symlink to this binary), insert its subcommand.
pub(crate) fn args_with_plugin_from_argv0(mut args: Vec<OsString>) -> Vec<OsString> {
    let plugin = args
        .first()
        .and_then(|p| Path::new(p).file_name())
        .and_then(|n| n.to_str())
        .and_then(Plugin::from_file_name);
    if let Some(plugin) = plugin {
        args.insert(1.min(args.len()), OsString::from(plugin.as_str()));
    }
    args
}
