//! Jira team board: issues of a saved filter, grouped by assignee.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::cache::{IconCache, FALLBACK_ICON};
use crate::config::{JIRA_AUTH, JIRA_HOST, JIRA_PROJECT, JIRA_TEAM};
use crate::errors::MenuError;
use crate::http::RestClient;
use crate::menu::{truncate, Menu, MenuItem, MUTED};

use super::jira::{browse_url, search, ApiIssue};
use super::{Context, Output};

pub const CACHE_NAME: &str = "jirateam";
pub const UNASSIGNED: &str = "Unassigned";

const FIELDS: &str = "summary,issuetype,assignee,status";
const SUMMARY_MAX: usize = 50;
const PER_PERSON: usize = 10;

#[derive(Debug, Deserialize)]
struct Filter {
    jql: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamIssue {
    pub key: String,
    pub summary: String,
    pub href: String,
    /// Base64 PNG for the issue type.
    pub image: String,
    pub status: String,
    pub assignee: String,
    pub days_in_state: Option<i64>,
}

/// Issues per assignee display name, sorted by name.
pub type Team = BTreeMap<String, Vec<TeamIssue>>;

/// Resolve a saved filter id to its JQL.
pub fn filter_jql(client: &RestClient, filter_id: &str) -> Result<String, MenuError> {
    let path = format!("/rest/api/2/filter/{}", urlencoding::encode(filter_id));
    let filter: Filter = client.get_json(client.url(&path, &[])?)?;
    Ok(filter.jql)
}

/// Days since the most recent status transition, or `None` without one.
pub fn days_in_state(issue: &ApiIssue, today: NaiveDate) -> Option<i64> {
    issue
        .changelog
        .as_ref()?
        .histories
        .iter()
        .filter(|h| h.items.iter().any(|i| i.field == "status"))
        .filter_map(|h| {
            let day = h.created.get(..10)?;
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        })
        .max()
        .map(|changed| (today - changed).num_days())
}

/// Key as displayed: the configured project prefix (`PROJ-`) is dropped.
pub fn short_key(key: &str, project: Option<&str>) -> String {
    match project {
        Some(p) if !p.is_empty() => key
            .strip_prefix(p)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(key)
            .to_string(),
        _ => key.to_string(),
    }
}

pub fn to_team_issue(
    host: &str,
    issue: ApiIssue,
    today: NaiveDate,
    icon: impl FnOnce(&str, Option<&str>) -> String,
) -> TeamIssue {
    let days_in_state = days_in_state(&issue, today);
    let image = match issue.fields.issuetype.as_ref() {
        Some(t) => icon(&t.name, t.icon_url.as_deref()),
        None => FALLBACK_ICON.to_string(),
    };
    TeamIssue {
        href: browse_url(host, &issue.key),
        summary: issue.fields.summary,
        image,
        status: issue
            .fields
            .status
            .map(|s| s.name)
            .unwrap_or_else(|| "?".to_string()),
        assignee: issue
            .fields
            .assignee
            .map(|a| a.display_name)
            .unwrap_or_else(|| UNASSIGNED.to_string()),
        key: issue.key,
        days_in_state,
    }
}

pub fn group_by_assignee(issues: Vec<TeamIssue>) -> Team {
    let mut team = Team::new();
    for issue in issues {
        team.entry(issue.assignee.clone()).or_default().push(issue);
    }
    team
}

pub fn fetch_team(
    client: &RestClient,
    filter_id: &str,
    icons: &mut IconCache,
    today: NaiveDate,
) -> Result<Team, MenuError> {
    let jql = filter_jql(client, filter_id)?;
    tracing::debug!(filter_id, jql = %jql, "resolved team filter");
    let issues = search(client, &jql, FIELDS, Some("changelog"))?;
    let issues = issues
        .into_iter()
        .map(|issue| {
            to_team_issue(client.host(), issue, today, |name, url| match url {
                Some(url) => icons.get_or_fallback(name, || client.get_bytes(url)),
                None => FALLBACK_ICON.to_string(),
            })
        })
        .collect();
    Ok(group_by_assignee(issues))
}

pub fn filter_url(host: &str, filter_id: &str) -> String {
    format!("{host}/issues/?filter={}", urlencoding::encode(filter_id))
}

pub fn render(host: &str, filter_id: &str, project: Option<&str>, team: &Team) -> Menu {
    let mut menu = Menu::new("Team");
    for (name, issues) in team {
        menu.push(MenuItem::new(format!(
            "{name} <span color='{MUTED}'>({} issues)</span>",
            issues.len()
        )));
        for issue in issues.iter().take(PER_PERSON) {
            let days = issue
                .days_in_state
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?".to_string());
            menu.push(
                MenuItem::new(format!(
                    "{} - {} - {} <span color=\"{MUTED}\">({days} days)</span>",
                    issue.status.to_uppercase(),
                    short_key(&issue.key, project),
                    truncate(&issue.summary, SUMMARY_MAX),
                ))
                .depth(1)
                .size(10)
                .color("#bbb")
                .href(&issue.href)
                .image(&issue.image),
            );
        }
    }
    if team.is_empty() {
        menu.push(MenuItem::new("No issues").color(MUTED));
    }
    menu.section();
    menu.push(MenuItem::new("Go to Jira").href(filter_url(host, filter_id)));
    menu
}

pub fn run(ctx: &Context) -> Result<Output, MenuError> {
    let host = ctx.settings.require_host(&JIRA_HOST)?;
    let auth = ctx.settings.require_auth(&JIRA_AUTH)?;
    let filter_id = ctx.settings.require(&JIRA_TEAM)?;
    let project = ctx.settings.get(&JIRA_PROJECT);

    let client = RestClient::new(&host, auth)?;
    let mut icons = IconCache::open(ctx.cache_file(CACHE_NAME));
    let today = chrono::Local::now().date_naive();
    let team = fetch_team(&client, &filter_id, &mut icons, today)?;
    icons.close();
    Ok(Output::Menu(render(&host, &filter_id, project.as_deref(), &team)))
}
