//! Jira issues assigned to the current user, plus the REST types shared with `jira_team`.

use serde::Deserialize;

use crate::config::{JIRA_AUTH, JIRA_HOST};
use crate::errors::MenuError;
use crate::http::RestClient;
use crate::menu::{titleize, truncate, Menu, MenuItem, MUTED};

use super::{Context, Output};

pub const ASSIGNED_JQL: &str = "assignee = currentUser() AND statusCategory != done";
pub const SEARCH_PATH: &str = "/rest/api/2/search";
const SUMMARY_MAX: usize = 40;
const MAX_RESULTS: &str = "100";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<ApiIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiIssue {
    pub key: String,
    #[serde(rename = "self")]
    pub self_url: String,
    pub fields: Fields,
    #[serde(default)]
    pub changelog: Option<Changelog>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub issuetype: Option<IssueType>,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub histories: Vec<History>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct History {
    pub created: String,
    #[serde(default)]
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    pub field: String,
}

/// Run a JQL search. `expand` is passed through when non-empty.
pub fn search(
    client: &RestClient,
    jql: &str,
    fields: &str,
    expand: Option<&str>,
) -> Result<Vec<ApiIssue>, MenuError> {
    let mut query = vec![("fields", fields), ("maxResults", MAX_RESULTS), ("jql", jql)];
    if let Some(expand) = expand {
        query.push(("expand", expand));
    }
    let url = client.url(SEARCH_PATH, &query)?;
    let raw: serde_json::Value = client.get_json(url)?;
    tracing::debug!(payload = %raw, "search result");
    let resp: SearchResponse = serde_json::from_value(raw)?;
    Ok(resp.issues)
}

/// `<host>/browse/<KEY>`
pub fn browse_url(host: &str, key: &str) -> String {
    format!("{host}/browse/{}", urlencoding::encode(key))
}

/// One assigned issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub href: String,
}

pub fn fetch_assigned(client: &RestClient) -> Result<Vec<Issue>, MenuError> {
    Ok(search(client, ASSIGNED_JQL, "summary", None)?
        .into_iter()
        .map(|i| Issue {
            href: browse_url(client.host(), &i.key),
            key: i.key,
            summary: i.fields.summary,
        })
        .collect())
}

pub fn render(issues: &[Issue]) -> Menu {
    let mut menu = Menu::new(titleize(issues.len(), "Issue"));
    for issue in issues {
        menu.push(
            MenuItem::new(format!(
                "{} - {}",
                issue.key,
                truncate(&issue.summary, SUMMARY_MAX)
            ))
            .href(&issue.href),
        );
    }
    if issues.is_empty() {
        menu.push(MenuItem::new("No issues").color(MUTED));
    }
    menu
}

pub fn run(ctx: &Context) -> Result<Output, MenuError> {
    let host = ctx.settings.require_host(&JIRA_HOST)?;
    let auth = ctx.settings.require_auth(&JIRA_AUTH)?;
    let client = RestClient::new(&host, auth)?;
    let issues = fetch_assigned(&client)?;
    Ok(Output::Menu(render(&issues)))
}
