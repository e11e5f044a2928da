#![allow(clippy::module_name_repetitions)]
//! Small utilities: shell quoting for `bash=` menu actions, path defaults, text helpers.

pub mod exec;
pub mod fs;

pub use exec::{CommandRunner, ExecOutput, ExecRequest, ExecService};

/// Reject strings containing newline, carriage return, or NUL before embedding into a menu line.
///
/// Keep error text stable (tests depend on it).
pub fn reject_newlines(s: &str, what: &str) -> Result<(), String> {
    if s.contains('\n') || s.contains('\r') || s.contains('\0') {
        Err(format!("refusing to render {what}: contains newline"))
    } else {
        Ok(())
    }
}

pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_escape(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote for `bash -c`. Single quotes are used so the result survives being
/// placed inside the double-quoted `bash="..."` attribute.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_=./:@".contains(c))
    {
        s.to_string()
    } else {
        let escaped = s.replace('\'', "'\"'\"'");
        format!("'{}'", escaped)
    }
}

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escape_simple() {
        assert_eq!(shell_escape("abc-123_./:@"), "abc-123_./:@");
        assert_eq!(
            shell_escape("http://77.235.42.90/;stream/1"),
            "'http://77.235.42.90/;stream/1'"
        );
    }

    #[test]
    fn test_shell_escape_with_spaces_and_quotes() {
        assert_eq!(shell_escape("a b c"), "'a b c'");
        assert_eq!(shell_escape("O'Reilly"), "'O'\"'\"'Reilly'");
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn test_shell_join() {
        let args = vec!["virsh".to_string(), "start".to_string(), "my vm".to_string()];
        assert_eq!(shell_join(&args), "virsh start 'my vm'");
    }

    #[test]
    fn test_reject_newlines() {
        assert!(reject_newlines("ok", "menu line").is_ok());
        assert_eq!(
            reject_newlines("a\nb", "menu line").unwrap_err(),
            "refusing to render menu line: contains newline"
        );
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  fix \t the\n\nbug  "), "fix the bug");
    }
}
