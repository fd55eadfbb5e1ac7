use super::shell::ShellDialect;

/// Quote `path` so `dialect` reads it back as exactly one literal argument
///
/// - bash, zsh, unknown: `'...'`, with `'` written as `'\''`
/// - fish: `'...'`, with `\` written as `\\` and `'` as `\'`
/// - PowerShell: `"..."`, with `` ` ``, `$` and `"` prefixed by a backtick
/// - cmd: `"..."`, with `%` and `"` doubled
pub fn quote_path(path: &str, dialect: ShellDialect) -> String {
    match dialect {
        ShellDialect::Bash | ShellDialect::Zsh | ShellDialect::Unknown => {
            format!("'{}'", path.replace('\'', r"'\''"))
        }
        ShellDialect::Fish => {
            format!("'{}'", path.replace('\\', r"\\").replace('\'', r"\'"))
        }
        ShellDialect::PowerShell => {
            // Backticks first so the escapes added below stay single
            let escaped = path
                .replace('`', "``")
                .replace('$', "`$")
                .replace('"', "`\"");
            format!("\"{}\"", escaped)
        }
        ShellDialect::Cmd => {
            format!("\"{}\"", path.replace('%', "%%").replace('"', "\"\""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Read back one single-quoted POSIX word
    fn unquote_posix(quoted: &str) -> String {
        let mut out = String::new();
        let mut chars = quoted.chars();
        let mut in_single = false;
        while let Some(c) = chars.next() {
            match (in_single, c) {
                (true, '\'') => in_single = false,
                (true, c) => out.push(c),
                (false, '\'') => in_single = true,
                (false, '\\') => out.extend(chars.next()),
                (false, c) => panic!("unquoted {:?} in {:?}", c, quoted),
            }
        }
        assert!(!in_single, "unterminated quote in {:?}", quoted);
        out
    }

    /// fish single quotes only treat `\'` and `\\` as escapes
    fn unquote_fish(quoted: &str) -> String {
        let inner = quoted
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .expect("wrapped in single quotes");
        let mut out = String::new();
        let mut chars = inner.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if matches!(chars.peek(), Some('\'' | '\\')) => out.extend(chars.next()),
                '\'' => panic!("bare quote in {:?}", quoted),
                c => out.push(c),
            }
        }
        out
    }

    fn unquote_powershell(quoted: &str) -> String {
        let inner = quoted
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .expect("wrapped in double quotes");
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '`' => out.extend(chars.next()),
                '$' => panic!("unescaped variable in {:?}", quoted),
                '"' => panic!("string ends early in {:?}", quoted),
                c => out.push(c),
            }
        }
        out
    }

    fn unquote_cmd(quoted: &str) -> String {
        let inner = quoted
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .expect("wrapped in double quotes");
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' | '"' => {
                    assert_eq!(chars.next(), Some(c), "undoubled {:?} in {:?}", c, quoted);
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out
    }

    fn unquote(quoted: &str, dialect: ShellDialect) -> String {
        match dialect {
            ShellDialect::Bash | ShellDialect::Zsh | ShellDialect::Unknown => unquote_posix(quoted),
            ShellDialect::Fish => unquote_fish(quoted),
            ShellDialect::PowerShell => unquote_powershell(quoted),
            ShellDialect::Cmd => unquote_cmd(quoted),
        }
    }

    #[test]
    fn test_posix() {
        assert_eq!(quote_path("/tmp/a b.png", ShellDialect::Bash), "'/tmp/a b.png'");
        assert_eq!(quote_path("/tmp/it's.png", ShellDialect::Zsh), r"'/tmp/it'\''s.png'");
        assert_eq!(quote_path("/tmp/$HOME`x`", ShellDialect::Unknown), "'/tmp/$HOME`x`'");
    }

    #[test]
    fn test_fish_scenario() {
        let path = r#"/home/user/it's a "test" dir/img.png"#;
        let quoted = quote_path(path, ShellDialect::Fish);
        assert_eq!(quoted, r#"'/home/user/it\'s a "test" dir/img.png'"#);
        assert_eq!(unquote_fish(&quoted), path);
    }

    #[test]
    fn test_fish_backslash() {
        assert_eq!(quote_path(r"/tmp/a\'b", ShellDialect::Fish), r"'/tmp/a\\\'b'");
    }

    #[test]
    fn test_powershell_escape_order() {
        assert_eq!(
            quote_path("C:\\img\\`$x\".png", ShellDialect::PowerShell),
            "\"C:\\img\\```$x`\".png\""
        );
    }

    #[test]
    fn test_cmd() {
        assert_eq!(
            quote_path(r#"C:\100% "real"\a.png"#, ShellDialect::Cmd),
            r#""C:\100%% ""real""\a.png""#
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn prop_round_trip(path in r#"/[a-zA-Z0-9 '"`$%\\/._é日本🎉-]{0,40}"#) {
            for dialect in ShellDialect::ALL {
                let quoted = quote_path(&path, dialect);
                prop_assert_eq!(unquote(&quoted, dialect), path.clone(), "dialect {}", dialect);
            }
        }
    }
}
