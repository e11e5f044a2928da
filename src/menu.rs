//! Argos/BitBar menu markup.
//!
//! A rendered menu is a title line, `---`, then entries. Further sections are
//! separated by another `---`. Entries may carry `| key=value` attributes and
//! are nested into submenus by prefixing `--` per level.
//!
//! ```text
//! 2 PRs
//! ---
//! fix login redirect | href=https://git.example.com/pr/1
//! --Shutdown | terminal=false bash="virsh shutdown web01"
//! ```

use crate::errors::MenuError;
use crate::util::reject_newlines;

pub const SEPARATOR: &str = "---";
pub const ERROR_TITLE: &str = "Err";

/// Stands in for `|` in entry text; Argos starts attributes at the first `|`.
const PIPE_STANDIN: &str = "\u{a6}";

/// Muted grey used for placeholder entries.
pub const MUTED: &str = "#888";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    text: String,
    depth: usize,
    attrs: Vec<(String, String)>,
}

impl MenuItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            depth: 0,
            attrs: Vec::new(),
        }
    }

    /// Nest under the previous entry at `depth` levels (`--` per level).
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attrs.push((key.to_string(), value.into()));
        self
    }

    pub fn href(self, url: impl Into<String>) -> Self {
        self.attr("href", url)
    }

    /// Base64 PNG shown next to the entry.
    pub fn image(self, base64_png: impl Into<String>) -> Self {
        self.attr("image", base64_png)
    }

    pub fn color(self, color: impl Into<String>) -> Self {
        self.attr("color", color)
    }

    pub fn size(self, points: u32) -> Self {
        self.attr("size", points.to_string())
    }

    /// Run `command` with bash on click, without opening a terminal.
    pub fn bash(self, command: impl Into<String>) -> Self {
        self.attr("terminal", "false").attr("bash", command)
    }

    pub fn render(&self) -> Result<String, MenuError> {
        reject_newlines(&self.text, "menu entry").map_err(MenuError::Parse)?;
        let mut line = "--".repeat(self.depth);
        line.push_str(&self.text.replace('|', PIPE_STANDIN));
        if !self.attrs.is_empty() {
            let attrs = self
                .attrs
                .iter()
                .map(|(k, v)| {
                    reject_newlines(v, k).map_err(MenuError::Parse)?;
                    Ok(format!("{k}={}", quote_attr(v)))
                })
                .collect::<Result<Vec<_>, MenuError>>()?;
            line.push_str(" | ");
            line.push_str(&attrs.join(" "));
        }
        Ok(line)
    }
}

/// Quote an attribute value when it contains whitespace or quoting characters.
/// Argos splits the attribute list shell-style, so `"` and `\` are escaped.
fn quote_attr(v: &str) -> String {
    let needs_quotes = v.is_empty()
        || v
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '|' | '$' | '`'));
    if !needs_quotes {
        return v.to_string();
    }
    let mut out = String::with_capacity(v.len() + 2);
    out.push('"');
    for c in v.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    title: String,
    sections: Vec<Vec<MenuItem>>,
}

impl Menu {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: vec![Vec::new()],
        }
    }

    /// Two-line error block shown when data could not be fetched.
    pub fn error(message: impl Into<String>) -> Self {
        let mut menu = Self::new(ERROR_TITLE);
        menu.push(MenuItem::new(message.into().replace(['\n', '\r'], " ")));
        menu
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn push(&mut self, item: MenuItem) -> &mut Self {
        if let Some(section) = self.sections.last_mut() {
            section.push(item);
        }
        self
    }

    pub fn extend<I>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = MenuItem>,
    {
        for item in items {
            self.push(item);
        }
        self
    }

    /// Start a new section; rendered behind a `---` line.
    pub fn section(&mut self) -> &mut Self {
        self.sections.push(Vec::new());
        self
    }

    pub fn items(&self) -> impl Iterator<Item = &MenuItem> {
        self.sections.iter().flatten()
    }

    pub fn render(&self) -> Result<String, MenuError> {
        reject_newlines(&self.title, "menu title").map_err(MenuError::Parse)?;
        let mut lines = vec![self.title.clone(), SEPARATOR.to_string()];
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                lines.push(SEPARATOR.to_string());
            }
            for item in section {
                lines.push(item.render()?);
            }
        }
        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }
}

/// Output for "show nothing" (e.g. service host unreachable).
pub fn blank() -> &'static str {
    " \n"
}

/// Pluralize a count for a title: `No PRs`, `1 PR`, `3 PRs`.
pub fn titleize(count: usize, noun: &str) -> String {
    match count {
        0 => format!("No {noun}s"),
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}

/// First `max` characters of `s`, trimmed. Never splits a character.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim().to_string(),
        None => s.trim().to_string(),
    }
}
