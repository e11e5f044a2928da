//! Menu plugins. Each one resolves its settings, fetches, and returns a menu;
//! `execute` applies the shared error policy (Err block + non-zero exit).

pub mod bitbucket;
pub mod jira;
pub mod jira_team;
pub mod radio;
pub mod virt;

use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::cache::cache_file_for;
use crate::config::Settings;
use crate::errors::{display_for_menu_error, exit_code_for_menu_error, MenuError};
use crate::menu::{blank, Menu};
use crate::util::exec::{CommandRunner, ExecService};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum Plugin {
    Bitbucket,
    Jira,
    #[value(name = "jira-team", alias = "jirateam")]
    JiraTeam,
    Radio,
    #[value(name = "virt", alias = "virt-manager")]
    Virt,
}

impl Plugin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plugin::Bitbucket => "bitbucket",
            Plugin::Jira => "jira",
            Plugin::JiraTeam => "jira-team",
            Plugin::Radio => "radio",
            Plugin::Virt => "virt",
        }
    }

    /// Plugin for an Argos file name such as `jirateam.1c.300s+` (text before the first `.`).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.split('.').next().unwrap_or_default();
        Plugin::from_str(stem, true).ok()
    }
}

/// Everything a plugin needs from the outside world for one invocation.
pub struct Context {
    pub settings: Settings,
    pub cache_dir: PathBuf,
    pub runner: Box<dyn CommandRunner>,
}

impl Context {
    pub fn new(settings: Settings, cache_dir: &Path) -> Self {
        Self {
            settings,
            cache_dir: cache_dir.to_path_buf(),
            runner: Box::new(ExecService::default()),
        }
    }

    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn cache_file(&self, plugin: &str) -> PathBuf {
        cache_file_for(&self.cache_dir, plugin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Menu(Menu),
    /// Print nothing visible; the service is not reachable from here.
    Blank,
}

pub fn build(plugin: Plugin, ctx: &Context) -> Result<Output, MenuError> {
    let _span = tracing::debug_span!("plugin", name = plugin.as_str()).entered();
    match plugin {
        Plugin::Bitbucket => bitbucket::run(ctx),
        Plugin::Jira => jira::run(ctx),
        Plugin::JiraTeam => jira_team::run(ctx),
        Plugin::Radio => radio::run(ctx),
        Plugin::Virt => virt::run(ctx),
    }
}

/// Text for stdout and the process exit code.
pub fn finish(result: Result<Output, MenuError>) -> (String, u8) {
    let err = match result {
        Ok(Output::Blank) => return (blank().to_string(), 0),
        Ok(Output::Menu(menu)) => match menu.render() {
            Ok(text) => return (text, 0),
            Err(e) => e,
        },
        Err(e) => e,
    };
    tracing::error!(error = %err, "menu failed");
    let code = exit_code_for_menu_error(&err);
    let text = Menu::error(display_for_menu_error(&err))
        .render()
        .unwrap_or_else(|_| "Err\n---\n".to_string());
    (text, code)
}

pub fn execute(plugin: Plugin, ctx: &Context) -> (String, u8) {
    finish(build(plugin, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuItem;

    #[test]
    fn test_from_file_name() {
        assert_eq!(Plugin::from_file_name("bitbucket.1c.300s+"), Some(Plugin::Bitbucket));
        assert_eq!(Plugin::from_file_name("jirateam.1c.300s+.sh"), Some(Plugin::JiraTeam));
        assert_eq!(Plugin::from_file_name("jira-team"), Some(Plugin::JiraTeam));
        assert_eq!(Plugin::from_file_name("virt-manager.1c.60s+"), Some(Plugin::Virt));
        assert_eq!(Plugin::from_file_name("Radio.3s"), Some(Plugin::Radio));
        assert_eq!(Plugin::from_file_name("argos-menus"), None);
    }

    #[test]
    fn test_finish_error_policy() {
        let (text, code) = finish(Err(MenuError::MissingSetting("JIRA_AUTH".to_string())));
        assert_eq!(text, "Err\n---\nUnable to find JIRA_AUTH in environment.\n");
        assert_eq!(code, 1);
    }

    #[test]
    fn test_finish_menu_and_blank() {
        let mut menu = Menu::new("VMs");
        menu.push(MenuItem::new("x"));
        assert_eq!(finish(Ok(Output::Menu(menu))), ("VMs\n---\nx\n".to_string(), 0));
        assert_eq!(finish(Ok(Output::Blank)), (" \n".to_string(), 0));
    }

    #[test]
    fn test_missing_program_exits_127() {
        use crate::util::exec::ScriptedRunner;
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = Context::new(Settings::default(), td.path())
            .with_runner(Box::new(ScriptedRunner::default()));
        let (text, code) = execute(Plugin::Virt, &ctx);
        assert!(text.starts_with("Err\n---\n"), "{text}");
        assert_eq!(code, 127);
    }

    #[test]
    fn test_radio_through_context() {
        use crate::util::exec::ScriptedRunner;
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = Context::new(Settings::default(), td.path())
            .with_runner(Box::new(ScriptedRunner::default().ok("ps ax", "")));
        assert_eq!(ctx.cache_file("jirateam"), td.path().join("jirateam-cache.json"));
        let (text, code) = execute(Plugin::Radio, &ctx);
        assert!(text.starts_with("Radio\n---\n90.5 WBER"), "{text}");
        assert_eq!(code, 0);
    }

    #[test]
    fn test_finish_render_failure_becomes_err_block() {
        let mut menu = Menu::new("t");
        menu.push(MenuItem::new("a\nb"));
        let (text, code) = finish(Ok(Output::Menu(menu)));
        assert!(text.starts_with("Err\n---\n"));
        assert_eq!(code, 1);
    }
}
