//! Internet radio through a headless VLC.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::MenuError;
use crate::menu::{truncate, Menu, MenuItem};
use crate::util::exec::{CommandRunner, ExecRequest};
use crate::util::shell_escape;

use super::{Context, Output};

pub const STATIONS_FILE: &str = "stations.yaml";
pub const IDLE_TITLE: &str = "Radio";

const TITLE_MAX: usize = 9;
const PLAYER_MARKER: &str = "vlc -I dummy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub url: String,
}

impl Station {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

pub fn default_stations() -> Vec<Station> {
    vec![
        Station::new("90.5 WBER - Alternative", "http://wber.org/wber.m3u"),
        Station::new("Idobi Alternative", "http://69.46.75.98/"),
        Station::new("Lounge Radio", "http://77.235.42.90/;stream/1"),
        Station::new("Thailand Library", "http://112.121.150.133:9114/"),
    ]
}

/// Stations from `<config-dir>/stations.yaml`, or the built-in list when absent.
pub fn load_stations(config_dir: &Path) -> Result<Vec<Station>, MenuError> {
    let path = config_dir.join(STATIONS_FILE);
    match fs::read_to_string(&path) {
        Ok(raw) => serde_yaml::from_str(&raw).map_err(|e| {
            MenuError::Parse(format!("{}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default_stations()),
        Err(e) => Err(e.into()),
    }
}

/// Stream URLs of running `vlc -I dummy <url>` processes in `ps ax` output.
pub fn playing_urls(ps_output: &str) -> Vec<String> {
    ps_output
        .lines()
        .filter(|l| l.contains(PLAYER_MARKER))
        .filter_map(|l| l.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

pub fn current_station<'a>(runner: &dyn CommandRunner, stations: &'a [Station]) -> Option<&'a Station> {
    let out = match runner.run(ExecRequest::new("ps").arg("ax")) {
        Ok(out) => out,
        Err(e) => {
            tracing::debug!(error = %e, "ps failed; assuming nothing plays");
            return None;
        }
    };
    let urls = playing_urls(&out.stdout);
    stations.iter().find(|s| urls.iter().any(|u| *u == s.url))
}

pub fn play_command(url: &str) -> String {
    format!("killall vlc; vlc -I dummy {}", shell_escape(url))
}

pub fn render(current: Option<&Station>, stations: &[Station]) -> Menu {
    let title = current.map(|s| s.name.as_str()).unwrap_or(IDLE_TITLE);
    let mut menu = Menu::new(truncate(title, TITLE_MAX));
    for station in stations {
        menu.push(MenuItem::new(&station.name).bash(play_command(&station.url)));
    }
    menu.section();
    menu.push(MenuItem::new("Stop Playback").bash("killall vlc"));
    menu
}

pub fn run(ctx: &Context) -> Result<Output, MenuError> {
    let stations = load_stations(ctx.settings.config_dir())?;
    let current = current_station(ctx.runner.as_ref(), &stations);
    Ok(Output::Menu(render(current, &stations)))
}
