use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;

use argos_menus::util::fs::{default_cache_dir, default_config_dir};
use argos_menus::{plugins, Context, Plugin, Settings};

mod cli;

use cli::{args_with_plugin_from_argv0, Cli, Command};

/// Write menu text; a closed stdout (Argos gave up on us) is not an error worth reporting.
fn emit(text: &str) {
    let mut out = io::stdout().lock();
    let _ = out.write_all(text.as_bytes()).and_then(|_| out.flush());
}

fn run_plugin(plugin: Plugin, config_dir: &Path, cache_dir: &Path) -> ExitCode {
    let ctx = Context::new(Settings::load(config_dir), cache_dir);
    let (text, code) = plugins::execute(plugin, &ctx);
    emit(&text);
    ExitCode::from(code)
}

fn run_cache_clear(cache_dir: &Path) -> anyhow::Result<()> {
    let use_err = argos_menus::color_enabled_stderr();
    let removed = argos_menus::clear_cache_dir(cache_dir)
        .with_context(|| format!("clearing caches under {}", cache_dir.display()))?;
    if removed.is_empty() {
        argos_menus::log_info_stderr(use_err, "argos-menus: no caches to clear");
    }
    for path in &removed {
        argos_menus::log_info_stderr(use_err, &format!("argos-menus: removed {}", path.display()));
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(args_with_plugin_from_argv0(std::env::args_os().collect()));
    if let Some(mode) = cli.color {
        argos_menus::set_color_mode(mode);
    }
    argos_menus::init_logging(cli.debug);

    let config_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);
    let cache_dir = cli.cache_dir.clone().unwrap_or_else(default_cache_dir);
    tracing::debug!(config_dir = %config_dir.display(), cache_dir = %cache_dir.display(), "directories");

    match cli.command {
        Command::Bitbucket => run_plugin(Plugin::Bitbucket, &config_dir, &cache_dir),
        Command::Jira => run_plugin(Plugin::Jira, &config_dir, &cache_dir),
        Command::JiraTeam => run_plugin(Plugin::JiraTeam, &config_dir, &cache_dir),
        Command::Radio => run_plugin(Plugin::Radio, &config_dir, &cache_dir),
        Command::Virt => run_plugin(Plugin::Virt, &config_dir, &cache_dir),
        Command::CacheClear => match run_cache_clear(&cache_dir) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                argos_menus::log_error_stderr(argos_menus::color_enabled_stderr(), &format!("{e:#}"));
                ExitCode::from(1)
            }
        },
        Command::Doctor => {
            argos_menus::doctor::run_doctor(&Settings::load(&config_dir), &cache_dir);
            ExitCode::SUCCESS
        }
    }
}
