use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use super::{DisplayServer, Os, PlatformDescriptor, WslVersion};

/// Mount point WSLg bridges GUI and clipboard traffic through
const WSLG_MOUNT: &str = "/mnt/wslg";

/// Well-known Windows PowerShell locations as seen from WSL (checked without a subprocess)
const POWERSHELL_LOCATIONS: &[&str] = &[
    "/mnt/c/Windows/System32/WindowsPowerShell/v1.0/powershell.exe",
    "/mnt/c/Program Files/PowerShell/7/pwsh.exe",
];

/// Executable names tried through the interop PATH
const POWERSHELL_NAMES: &[&str] = &["powershell.exe", "pwsh.exe"];

/// Host queries needed for platform detection
pub trait HostProbe: Send + Sync {
    /// Platform identifier in the style of `darwin` / `win32` / `linux`
    fn os_identifier(&self) -> String;

    /// Kernel version banner (`/proc/version` on Linux)
    fn kernel_version(&self) -> Option<String>;

    fn env_var(&self, name: &str) -> Option<String>;

    fn path_exists(&self, path: &Path) -> bool;

    fn which(&self, program: &str) -> Option<PathBuf>;
}

/// HostProbe reading the real process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn os_identifier(&self) -> String {
        env::consts::OS.to_string()
    }

    fn kernel_version(&self) -> Option<String> {
        fs::read_to_string("/proc/version").ok()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Compute a descriptor from scratch
pub fn detect_platform(probe: &dyn HostProbe) -> PlatformDescriptor {
    let os = Os::from_identifier(&probe.os_identifier());
    if os != Os::Linux {
        log::debug!("Detected {} host", os);
        return PlatformDescriptor::native(os, DisplayServer::Unknown);
    }

    let kernel = probe.kernel_version().unwrap_or_default().to_lowercase();
    let wsl_version = if kernel.contains("microsoft-standard-wsl2") {
        Some(WslVersion::V2)
    } else if kernel.contains("microsoft") {
        Some(WslVersion::V1)
    } else {
        None
    };

    let descriptor = match wsl_version {
        Some(version) => {
            let has_gui_interop = probe.path_exists(Path::new(WSLG_MOUNT));
            let display_server = detect_wsl_display_server(probe);
            let shell = find_powershell(probe);
            PlatformDescriptor::wsl(version, has_gui_interop, display_server, &shell)
        }
        None => PlatformDescriptor::native(Os::Linux, detect_display_server(probe)),
    };

    log::info!("Detected platform: {}", descriptor);
    descriptor
}

fn detect_display_server(probe: &dyn HostProbe) -> DisplayServer {
    if let Some(session) = probe.env_var("XDG_SESSION_TYPE") {
        match session.to_lowercase().as_str() {
            "wayland" => return DisplayServer::Wayland,
            "x11" => return DisplayServer::X11,
            _ => {}
        }
    }

    if probe.env_var("WAYLAND_DISPLAY").is_some() {
        return DisplayServer::Wayland;
    }

    DisplayServer::Unknown
}

fn detect_wsl_display_server(probe: &dyn HostProbe) -> DisplayServer {
    if probe.env_var("WAYLAND_DISPLAY").is_some() {
        DisplayServer::Wayland
    } else if probe.env_var("DISPLAY").is_some() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}

/// Locate Windows PowerShell from inside WSL
/// The bare name is a last resort that relies on the interop PATH at call time
fn find_powershell(probe: &dyn HostProbe) -> String {
    if let Some(found) = POWERSHELL_LOCATIONS
        .iter()
        .find(|p| probe.path_exists(Path::new(p)))
    {
        return found.to_string();
    }

    for name in POWERSHELL_NAMES {
        if let Some(path) = probe.which(name) {
            return path.to_string_lossy().into_owned();
        }
    }

    log::debug!("PowerShell not found in well-known locations or PATH, using bare name");
    POWERSHELL_NAMES[0].to_string()
}

/// Computed-once platform descriptor owned by the application
/// Every `get()` hands out the same `Arc`; `reset()` forces re-detection
pub struct PlatformCache<P: HostProbe = SystemProbe> {
    probe: P,
    descriptor: OnceLock<Arc<PlatformDescriptor>>,
}

impl PlatformCache<SystemProbe> {
    pub fn system() -> Self {
        Self::new(SystemProbe)
    }
}

impl<P: HostProbe> PlatformCache<P> {
    pub fn new(probe: P) -> Self {
        PlatformCache {
            probe,
            descriptor: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Arc<PlatformDescriptor> {
        Arc::clone(
            self.descriptor
                .get_or_init(|| Arc::new(detect_platform(&self.probe))),
        )
    }

    /// Drop the cached descriptor so the next `get()` re-detects
    pub fn reset(&mut self) {
        self.descriptor.take();
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }
}
