//! libvirt virtual machines through `virsh`.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::MenuError;
use crate::menu::{Menu, MenuItem};
use crate::util::exec::{CommandRunner, ExecRequest};
use crate::util::shell_join;

use super::{Context, Output};

pub const URI_ENV: &str = "ARGOS_MENUS_VIRSH_URI";
pub const DEFAULT_URI: &str = "qemu:///system";
const AGENT_TIMEOUT: Duration = Duration::from_secs(3);
const PRIMARY_IFACE: &str = "eth0";

pub const GREEN: &str = "iVBORw0KGgoAAAANSUhEUgAAAAoAAAAKCAYAAACNMs+9AAAACXBIWXMAAA7EAAAOxAGVKw4bAAAAqklEQVQYlXXPv0oDYRAE8N8cPlJInUouvk0IaCNY2KW5VxERc1ilszl8pU3xmfP8N7B8u/vNDjOB13FD6cU+rDVMVYbwst2e5DhuVLlPPCrEd5SDuLvCNY1U7WNG2ngb3rsqu6VA/hItuy6xmhk/mV/vqvtFurSLXdAVUz59ZeFvPmjep04ZLiGq+ZlrEXDoEm94+C9MOOApcBw3il7Zi3WaykcxiOeb/uQMuGw9O6IxxsUAAAAASUVORK5CYII=";
pub const GREY: &str = crate::cache::FALLBACK_ICON;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmState {
    Running,
    Paused,
    ShutOff,
    Other(String),
}

impl VmState {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "running" => VmState::Running,
            "paused" => VmState::Paused,
            "shut off" => VmState::ShutOff,
            other => VmState::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            VmState::Running => "running",
            VmState::Paused => "paused",
            VmState::ShutOff => "shut off",
            VmState::Other(s) => s,
        }
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vm {
    /// Domain id; inactive domains have none (`-`).
    pub id: Option<u32>,
    pub name: String,
    pub state: VmState,
    pub ip: Option<Ipv4Addr>,
}

static VM_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+|-)\s+(\S+)\s+(\S.*?)\s*$").expect("valid vm row regex"));

/// Parse `virsh list --all`; header, separator and blank lines are skipped.
/// Sorted by state label, then name.
pub fn parse_vm_list(output: &str) -> Vec<Vm> {
    let mut vms: Vec<Vm> = output
        .lines()
        .filter_map(|line| VM_ROW.captures(line))
        .map(|caps| Vm {
            id: caps[1].parse().ok(),
            name: caps[2].to_string(),
            state: VmState::parse(&caps[3]),
            ip: None,
        })
        .collect();
    vms.sort_by(|a, b| {
        a.state
            .label()
            .cmp(b.state.label())
            .then_with(|| a.name.cmp(&b.name))
    });
    vms
}

/// IPv4 address of `eth0` in `virsh domifaddr` output, else the first
/// non-loopback IPv4. Continuation rows (`-` as interface name) belong to the
/// interface above them.
pub fn parse_domifaddr(output: &str) -> Option<Ipv4Addr> {
    let mut iface = String::new();
    let mut fallback = None;
    for line in output.lines() {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() != 4 || cols[2] == "Protocol" {
            continue;
        }
        if cols[0] != "-" {
            iface = cols[0].to_string();
        }
        if iface == "lo" || cols[2] != "ipv4" {
            continue;
        }
        let addr = cols[3].split('/').next().unwrap_or_default();
        match addr.parse::<Ipv4Addr>() {
            Ok(ip) if ip.is_loopback() => {}
            Ok(ip) if iface == PRIMARY_IFACE => return Some(ip),
            Ok(ip) => {
                fallback.get_or_insert(ip);
            }
            Err(_) => {}
        }
    }
    fallback
}

/// Typed adapter over `virsh`.
pub struct Virsh<'a> {
    runner: &'a dyn CommandRunner,
    uri: String,
}

impl<'a> Virsh<'a> {
    pub fn new(runner: &'a dyn CommandRunner, uri: impl Into<String>) -> Self {
        Self {
            runner,
            uri: uri.into(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// State names are parsed, so force the untranslated locale.
    fn request(&self, args: &[&str]) -> ExecRequest {
        ExecRequest::new("virsh")
            .args(["-c", self.uri.as_str()])
            .args(args.iter().copied())
            .env("LC_ALL", "C")
    }

    pub fn list_all(&self) -> Result<Vec<Vm>, MenuError> {
        let out = self.runner.run(self.request(&["list", "--all"]))?;
        Ok(parse_vm_list(&out.stdout))
    }

    /// Guest-agent reported address; any failure (no agent, VM booting) is `None`.
    pub fn ip_address(&self, name: &str) -> Option<Ipv4Addr> {
        match self
            .runner
            .run(self.request(&["domifaddr", name, "--source", "agent"]).timeout(AGENT_TIMEOUT))
        {
            Ok(out) => parse_domifaddr(&out.stdout),
            Err(e) => {
                tracing::debug!(vm = name, error = %e, "no address from guest agent");
                None
            }
        }
    }

    /// Shell command line for a click action, e.g. `virsh -c qemu:///system start web01`.
    pub fn action(&self, verb: &str, name: &str) -> String {
        shell_join(&[
            "virsh".to_string(),
            "-c".to_string(),
            self.uri.clone(),
            verb.to_string(),
            name.to_string(),
        ])
    }
}

pub fn list_with_addresses(virsh: &Virsh<'_>) -> Result<Vec<Vm>, MenuError> {
    let mut vms = virsh.list_all()?;
    for vm in vms.iter_mut().filter(|vm| vm.state == VmState::Running) {
        vm.ip = virsh.ip_address(&vm.name);
    }
    Ok(vms)
}

pub fn render(virsh: &Virsh<'_>, vms: &[Vm]) -> Menu {
    let running = vms.iter().filter(|vm| vm.state == VmState::Running).count();
    let title = if running > 0 {
        format!("{running} VMs")
    } else {
        "VMs".to_string()
    };
    let mut menu = Menu::new(title);
    for vm in vms {
        let is_running = vm.state == VmState::Running;
        let label = match vm.ip {
            Some(ip) => format!("{} - {ip}", vm.name),
            None => vm.name.clone(),
        };
        menu.push(MenuItem::new(label).image(if is_running { GREEN } else { GREY }));
        if is_running {
            if let Some(ip) = vm.ip {
                menu.push(MenuItem::new("View Browser").depth(1).href(format!("https://{ip}")));
            }
            menu.push(
                MenuItem::new("View Console").depth(1).bash(shell_join(&[
                    "virt-manager".to_string(),
                    "--connect".to_string(),
                    virsh.uri().to_string(),
                    "--show-domain-console".to_string(),
                    vm.name.clone(),
                ])),
            );
            menu.push(MenuItem::new("Shutdown").depth(1).bash(virsh.action("shutdown", &vm.name)));
        } else {
            menu.push(MenuItem::new("Start").depth(1).bash(virsh.action("start", &vm.name)));
        }
    }
    menu.push(MenuItem::new("Open Virt Manager").bash("virt-manager"));
    menu
}

pub fn run(ctx: &Context) -> Result<Output, MenuError> {
    let uri = std::env::var(URI_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_URI.to_string());
    let virsh = Virsh::new(ctx.runner.as_ref(), uri);
    let vms = list_with_addresses(&virsh)?;
    Ok(Output::Menu(render(&virsh, &vms)))
}
