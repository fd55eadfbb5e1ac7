use std::fmt;

use crate::platform::Os;

/// Command interpreter whose quoting rules a path must follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellDialect {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Cmd,
    /// Anything else, quoted as POSIX sh
    Unknown,
}

impl ShellDialect {
    pub const ALL: [ShellDialect; 6] = [
        ShellDialect::Bash,
        ShellDialect::Zsh,
        ShellDialect::Fish,
        ShellDialect::PowerShell,
        ShellDialect::Cmd,
        ShellDialect::Unknown,
    ];

    /// Recognize a shell from an executable name or path
    ///
    /// Directories (either separator), the extension and case are ignored,
    /// so `C:\Program Files\PowerShell\7\pwsh.EXE` and `/usr/bin/fish` both
    /// match.
    pub fn from_executable(executable: &str) -> Option<ShellDialect> {
        match base_name(executable).as_str() {
            "bash" => Some(ShellDialect::Bash),
            "zsh" => Some(ShellDialect::Zsh),
            "fish" => Some(ShellDialect::Fish),
            "pwsh" | "powershell" => Some(ShellDialect::PowerShell),
            "cmd" => Some(ShellDialect::Cmd),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShellDialect::Bash => "bash",
            ShellDialect::Zsh => "zsh",
            ShellDialect::Fish => "fish",
            ShellDialect::PowerShell => "powershell",
            ShellDialect::Cmd => "cmd",
            ShellDialect::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ShellDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn base_name(executable: &str) -> String {
    let file = executable
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(executable);
    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };
    stem.to_lowercase()
}

/// Pick the dialect for the active terminal
///
/// The terminal's own shell path wins, then the shell environment variable.
/// A Windows host with no recognizable signal gets PowerShell.
pub fn detect_shell(terminal_shell_path: Option<&str>, shell_env: Option<&str>, os: Os) -> ShellDialect {
    let detected = [terminal_shell_path, shell_env]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .find_map(ShellDialect::from_executable);

    match detected {
        Some(dialect) => dialect,
        None if os == Os::Windows => ShellDialect::PowerShell,
        None => ShellDialect::Unknown,
    }
}
