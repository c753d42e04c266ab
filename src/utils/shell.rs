//! Shell quoting for the command transcript.

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument for display as a shell command line.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    // Characters that require quoting
    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote and join a full argv for display.
pub fn quote_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|a| quote_arg(a))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_args_pass_through() {
        assert_eq!(quote_arg("docker"), "docker");
        assert_eq!(quote_arg("--depth"), "--depth");
    }

    #[test]
    fn args_with_metacharacters_are_quoted() {
        assert_eq!(quote_arg("a b"), "'a b'");
        assert_eq!(
            quote_arg("apt-get update && pnpm build"),
            "'apt-get update && pnpm build'"
        );
    }

    #[test]
    fn embedded_single_quotes_are_escaped() {
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn empty_arg_is_visible() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn argv_joins_with_spaces() {
        let argv = vec!["git".to_string(), "clone".to_string(), "a b".to_string()];
        assert_eq!(quote_argv(&argv), "git clone 'a b'");
    }
}
