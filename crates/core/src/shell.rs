//! Shell quoting helpers

use std::borrow::Cow;

/// Quote each argument for a POSIX shell and join them with spaces
pub fn shell_quote_cmd<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| shell_words::quote(a.as_ref()))
        .collect::<Vec<Cow<'_, str>>>()
        .join(" ")
}

/// Format args as a shell-quoted command line wrapped at `max_width` columns
///
/// Lines are continued with ` \`; a single argument longer than the width is
/// never broken.
pub fn format_cmdline<S: AsRef<str>>(args: &[S], max_width: usize) -> String {
    // Room for the trailing " \"
    let width = max_width.saturating_sub(2);

    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for arg in args {
        let quoted = shell_words::quote(arg.as_ref());
        if !line.is_empty() && line.len() + quoted.len() + 1 > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&quoted);
    }
    lines.push(line);

    lines.join(" \\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_cmd() {
        assert_eq!(shell_quote_cmd(&["echo", "hello"]), "echo hello");
        assert_eq!(
            shell_quote_cmd(&["arg1", "arg2 with spaces"]),
            "arg1 'arg2 with spaces'"
        );
        assert_eq!(shell_quote_cmd::<&str>(&[]), "");
        assert_eq!(shell_quote_cmd(&[""]), "''");
    }

    #[test]
    fn test_quoted_command_splits_back() {
        let args = ["a b", "it's", "$HOME", "plain"];
        let quoted = shell_quote_cmd(&args);
        assert_eq!(shell_words::split(&quoted).unwrap(), args);
    }

    #[test]
    fn test_format_cmdline_short() {
        assert_eq!(format_cmdline(&["docker", "run", "-i"], 80), "docker run -i");
    }

    #[test]
    fn test_format_cmdline_wraps() {
        let args: Vec<String> = (0..30).map(|i| format!("arg{:02}", i)).collect();
        let formatted = format_cmdline(&args, 40);

        let lines: Vec<&str> = formatted.lines().collect();
        assert!(lines.len() > 1);
        for line in &lines[..lines.len() - 1] {
            assert!(line.ends_with(" \\"), "{line}");
            assert!(line.len() <= 40, "{line}");
        }

        let rejoined = formatted.replace(" \\\n", " ");
        assert_eq!(shell_words::split(&rejoined).unwrap(), args);
    }

    #[test]
    fn test_format_cmdline_long_argument_not_broken() {
        let long = "x".repeat(100);
        let formatted = format_cmdline(&["docker", long.as_str(), "end"], 80);
        assert_eq!(formatted, format!("docker \\\n{} \\\nend", long));
    }
}
