//! Argos/BitBar status-bar menus.
//!
//! One binary renders several menus (Bitbucket pull requests, Jira issues, a Jira
//! team board, internet radio, libvirt VMs). Each menu is a plain text document on
//! stdout; diagnostics go to stderr through `tracing`.

pub mod cache;
pub mod color;
pub mod config;
pub mod doctor;
pub mod errors;
pub mod http;
pub mod lock;
pub mod menu;
pub mod plugins;
pub mod telemetry;
pub mod util;

pub use cache::{cache_file_for, clear_cache_dir, IconCache, FALLBACK_ICON};
pub use color::{
    color_enabled_stderr, log_error_stderr, log_info_stderr, log_warn_stderr, paint,
    set_color_mode, ColorMode,
};
pub use config::{BasicAuth, Key, Settings, Source};
pub use errors::{display_for_menu_error, exit_code_for_io_error, exit_code_for_menu_error, MenuError};
pub use menu::{Menu, MenuItem};
pub use plugins::{Context, Output, Plugin};
pub use telemetry::init_logging;
