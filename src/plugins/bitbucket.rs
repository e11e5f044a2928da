//! Bitbucket Server pull request inbox.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::cache::IconCache;
use crate::config::{BITBUCKET_AUTH, BITBUCKET_HOST};
use crate::errors::MenuError;
use crate::http::{probe, RestClient};
use crate::menu::{titleize, truncate, Menu, MenuItem, MUTED};
use crate::util::collapse_whitespace;

use super::{Context, Output};

pub const CACHE_NAME: &str = "bitbucket";

const INBOX_PATH: &str = "/rest/api/latest/inbox/pull-requests";
const TITLE_MAX: usize = 80;
const LINE_MAX: usize = 60;
const REF_MAX: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Author,
    Reviewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Author => "AUTHOR",
            Role::Reviewer => "REVIEWER",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    values: Vec<ApiPullRequest>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPullRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    author: Participant,
    #[serde(default)]
    reviewers: Vec<Participant>,
    links: Links,
    from_ref: Ref,
    to_ref: Ref,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Participant {
    user: User,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    name: String,
    display_name: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(rename = "self", default)]
    self_: Vec<Href>,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ref {
    display_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Properties {
    #[serde(default)]
    merge_result: Option<MergeResult>,
}

#[derive(Debug, Deserialize)]
struct MergeResult {
    outcome: String,
}

/// One open pull request, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// First name of the author.
    pub author: String,
    pub title: String,
    pub href: String,
    pub from_ref: String,
    pub to_ref: String,
    pub conflict: bool,
    /// Base64 PNG avatar.
    pub image: String,
}

static TICKET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[A-Z][A-Z0-9]*-").expect("valid ticket prefix regex"));

/// Titles starting with a ticket reference (`[PROJ-123] ...`) are shown as-is;
/// otherwise the description reads better than an auto-generated branch title.
pub fn display_title(title: &str, description: Option<&str>) -> String {
    if TICKET_PREFIX.is_match(title) {
        return truncate(title, TITLE_MAX);
    }
    let cleaned = collapse_whitespace(&description.unwrap_or_default().replace('*', ""));
    if cleaned.is_empty() {
        truncate(title, TITLE_MAX)
    } else {
        truncate(&cleaned, TITLE_MAX)
    }
}

/// Reviewer `user` already marked the PR as needing work: nothing for them to do.
fn needs_work_by(user: &str, reviewers: &[Participant]) -> bool {
    reviewers
        .iter()
        .any(|r| r.status == "NEEDS_WORK" && r.user.name == user)
}

fn first_name(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .next()
        .unwrap_or(display_name)
        .to_string()
}

/// Fetch one inbox page for `role`, resolving avatars through `icons`.
pub fn fetch_pull_requests(
    client: &RestClient,
    role: Role,
    icons: &mut IconCache,
) -> Result<Vec<PullRequest>, MenuError> {
    let url = client.url(
        INBOX_PATH,
        &[
            ("role", role.as_str()),
            ("start", "0"),
            ("limit", "10"),
            ("avatarSize", "64"),
            ("withAttributes", "true"),
            ("state", "OPEN"),
            ("order", "oldest"),
        ],
    )?;
    let raw: serde_json::Value = client.get_json(url)?;
    tracing::debug!(role = role.as_str(), payload = %raw, "inbox page");
    let page: Page = serde_json::from_value(raw)?;
    if let Some(err) = page.errors.first() {
        return Err(MenuError::Api(
            err.message
                .clone()
                .unwrap_or_else(|| "Error fetching prs".to_string()),
        ));
    }

    let mut prs = Vec::new();
    for pr in page.values {
        if needs_work_by(client.user(), &pr.reviewers) {
            continue;
        }
        let href = pr
            .links
            .self_
            .first()
            .map(|h| h.href.clone())
            .unwrap_or_else(|| client.host().to_string());
        let image = match pr.author.user.avatar_url.as_deref() {
            Some(avatar) => icons.get_or_fallback(&pr.author.user.name, || client.get_bytes(avatar)),
            None => crate::cache::FALLBACK_ICON.to_string(),
        };
        let conflict = pr
            .properties
            .merge_result
            .as_ref()
            .map(|m| m.outcome == "CONFLICTED")
            .unwrap_or(false);
        prs.push(PullRequest {
            author: first_name(&pr.author.user.display_name),
            title: display_title(&pr.title, pr.description.as_deref()),
            href,
            from_ref: truncate(&pr.from_ref.display_id, REF_MAX),
            to_ref: truncate(&pr.to_ref.display_id, REF_MAX),
            conflict,
            image,
        });
    }
    Ok(prs)
}

pub fn render(host: &str, prs: &[PullRequest]) -> Menu {
    let mut menu = Menu::new(titleize(prs.len(), "PR"));
    for pr in prs {
        let conflict = if pr.conflict {
            " - <span color=\"#a70\">conflict</span>"
        } else {
            ""
        };
        // `\n` is a literal backslash-n: Argos renders it as a line break inside the entry.
        let text = format!(
            "{}\\n<span color=\"#999\"><small>{} → {}{}</small></span>",
            truncate(&pr.title, LINE_MAX),
            pr.from_ref,
            pr.to_ref,
            conflict
        );
        menu.push(MenuItem::new(text).href(&pr.href).image(&pr.image));
    }
    if prs.is_empty() {
        menu.push(MenuItem::new("No pull requests").color(MUTED));
    }
    menu.push(MenuItem::new("Go to Bitbucket").href(host));
    menu
}

pub fn run(ctx: &Context) -> Result<Output, MenuError> {
    let host = ctx.settings.require_host(&BITBUCKET_HOST)?;
    let auth = ctx.settings.require_auth(&BITBUCKET_AUTH)?;
    if !probe(&host) {
        tracing::info!(host = %host, "bitbucket unreachable; hiding menu");
        return Ok(Output::Blank);
    }
    let client = RestClient::new(&host, auth)?;
    let mut icons = IconCache::open(ctx.cache_file(CACHE_NAME));
    let mut prs = fetch_pull_requests(&client, Role::Author, &mut icons)?;
    prs.extend(fetch_pull_requests(&client, Role::Reviewer, &mut icons)?);
    icons.close();
    Ok(Output::Menu(render(&host, &prs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(title: &str, conflict: bool) -> PullRequest {
        PullRequest {
            author: "Alice".to_string(),
            title: title.to_string(),
            href: "https://git.example.com/pr/1".to_string(),
            from_ref: "feature/x".to_string(),
            to_ref: "main".to_string(),
            conflict,
            image: "AAAA".to_string(),
        }
    }

    #[test]
    fn test_display_title_ticket_prefix_keeps_title() {
        assert_eq!(
            display_title("[UNTY-123] Fix login", Some("long description")),
            "[UNTY-123] Fix login"
        );
        assert_eq!(display_title("[NO-JIRA] tweak", None), "[NO-JIRA] tweak");
    }

    #[test]
    fn test_display_title_uses_cleaned_description() {
        assert_eq!(
            display_title("feature/foo", Some("* Adds **retry**\n\n* to   the client")),
            "Adds retry to the client"
        );
        assert_eq!(display_title("feature/foo", Some("  \n ")), "feature/foo");
        assert_eq!(display_title("[lowercase-1] x", None), "[lowercase-1] x");
    }

    #[test]
    fn test_display_title_truncates_to_80() {
        let long = "word ".repeat(40);
        assert_eq!(display_title("branch", Some(&long)).chars().count(), 79);
        let t = format!("[ABC-1] {}", "y".repeat(100));
        assert_eq!(display_title(&t, None).chars().count(), 80);
    }

    #[test]
    fn test_needs_work_by() {
        let reviewers: Vec<Participant> = serde_json::from_str(
            r#"[{"user":{"name":"me","displayName":"Me Myself"},"status":"NEEDS_WORK"},
                {"user":{"name":"bob","displayName":"Bob"},"status":"APPROVED"}]"#,
        )
        .unwrap();
        assert!(needs_work_by("me", &reviewers));
        assert!(!needs_work_by("bob", &reviewers));
        assert!(!needs_work_by("carol", &reviewers));
    }

    #[test]
    fn test_render_lines() {
        let menu = render("https://git.example.com", &[pr("Fix it", true)]);
        let out = menu.render().unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "1 PR");
        assert_eq!(lines[1], "---");
        assert_eq!(
            lines[2],
            "Fix it\\n<span color=\"#999\"><small>feature/x → main - <span color=\"#a70\">conflict</span></small></span> | href=https://git.example.com/pr/1 image=AAAA"
        );
        assert_eq!(lines[3], "Go to Bitbucket | href=https://git.example.com");
    }

    #[test]
    fn test_render_empty() {
        let out = render("https://git.example.com", &[]).render().unwrap();
        assert_eq!(
            out,
            "No PRs\n---\nNo pull requests | color=#888\nGo to Bitbucket | href=https://git.example.com\n"
        );
    }

    #[test]
    fn test_render_truncates_line_to_60() {
        let out = render("h", &[pr(&"z".repeat(80), false)]).render().unwrap();
        let entry = out.lines().nth(2).unwrap();
        let shown = entry.split("\\n").next().unwrap();
        assert_eq!(shown.chars().count(), 60);
    }

    #[test]
    fn test_first_name() {
        assert_eq!(first_name("Alice Liddell"), "Alice");
        assert_eq!(first_name("Prince"), "Prince");
    }
}
