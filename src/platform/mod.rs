pub mod detect;

use std::fmt;

pub use detect::{HostProbe, PlatformCache, SystemProbe, detect_platform};

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Macos,
    Linux,
    Windows,
}

impl Os {
    /// Map a host platform identifier (`darwin`, `win32`, `linux`, ...) to a family
    /// Anything that is not macOS or Windows is treated as Linux
    pub fn from_identifier(id: &str) -> Self {
        match id.to_ascii_lowercase().as_str() {
            "darwin" | "macos" => Os::Macos,
            "win32" | "windows" => Os::Windows,
            _ => Os::Linux,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Os::Macos => "macos",
            Os::Linux => "linux",
            Os::Windows => "windows",
        })
    }
}

/// Linux windowing protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    X11,
    Wayland,
    Unknown,
}

impl fmt::Display for DisplayServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayServer::X11 => "x11",
            DisplayServer::Wayland => "wayland",
            DisplayServer::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WslVersion {
    V1,
    V2,
}

/// Snapshot of the host environment, computed once at startup
///
/// `wsl_version` and `has_gui_interop` only carry meaning when `is_wsl` is
/// true (which implies `os == Os::Linux`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub os: Os,
    pub is_wsl: bool,
    pub wsl_version: Option<WslVersion>,
    pub has_gui_interop: bool,
    pub display_server: DisplayServer,
    /// Windows-side PowerShell reachable from WSL
    pub shell_interop_path: Option<String>,
}

impl PlatformDescriptor {
    /// Plain (non-WSL) descriptor for an OS family and display server
    pub fn native(os: Os, display_server: DisplayServer) -> Self {
        PlatformDescriptor {
            os,
            is_wsl: false,
            wsl_version: None,
            has_gui_interop: false,
            display_server,
            shell_interop_path: None,
        }
    }

    /// WSL descriptor as produced by detection
    pub fn wsl(
        version: WslVersion,
        has_gui_interop: bool,
        display_server: DisplayServer,
        shell_interop_path: &str,
    ) -> Self {
        PlatformDescriptor {
            os: Os::Linux,
            is_wsl: true,
            wsl_version: Some(version),
            has_gui_interop,
            display_server,
            shell_interop_path: Some(shell_interop_path.to_string()),
        }
    }

    /// True when Windows-side tools are the natural clipboard route
    pub fn uses_windows_clipboard(&self) -> bool {
        self.os == Os::Windows || self.is_wsl
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.os)?;
        if self.is_wsl {
            let version = match self.wsl_version {
                Some(WslVersion::V1) => "1",
                Some(WslVersion::V2) => "2",
                None => "?",
            };
            write!(f, " (WSL{version}")?;
            if self.has_gui_interop {
                write!(f, ", WSLg")?;
            }
            write!(f, ")")?;
        }
        if self.os == Os::Linux {
            write!(f, ", display server: {}", self.display_server)?;
        }
        Ok(())
    }
}
