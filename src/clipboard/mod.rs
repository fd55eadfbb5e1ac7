pub mod backend;
pub mod chain;
pub mod error;
pub mod file_path;
pub mod format;
pub mod macos;
pub mod powershell;
pub mod wayland;
pub mod x11;

#[cfg(test)]
pub(crate) mod stub;

use std::sync::Arc;

use crate::exec::CommandRunner;
use crate::platform::{DisplayServer, Os, PlatformDescriptor};

pub use backend::ClipboardReader;
pub use chain::FallbackChain;
pub use error::{BackendFailure, ClipboardError};
pub use file_path::{FilePathReader, PathListSource};
pub use format::{ClipboardImage, ImageFormat};
pub use macos::{FinderFileUrl, OsascriptReader, PngpasteReader};
pub use powershell::{PowerShellFileDrop, PowerShellHost, PowerShellReader, WindowsHost, WslHost};
pub use wayland::{WlPasteReader, WlPasteUriList};
pub use x11::{XclipReader, XclipUriList};

/// Bare interop executable used when detection found no PowerShell path
const DEFAULT_WSL_POWERSHELL: &str = "powershell.exe";

/// Build the reader chain for the detected platform
///
/// Raw-bytes readers always come before file-path readers. On native Linux
/// the other display server's raw reader is tried as a cross-check before
/// falling back to file paths.
pub fn create_reader(
    platform: &PlatformDescriptor,
    runner: Arc<dyn CommandRunner>,
) -> FallbackChain {
    let readers: Vec<Box<dyn ClipboardReader>> = match platform.os {
        Os::Macos => vec![
            Box::new(PngpasteReader::new(runner.clone())),
            Box::new(OsascriptReader::new(runner.clone())),
            Box::new(FilePathReader::new(FinderFileUrl::new(runner))),
        ],
        Os::Windows => vec![
            Box::new(PowerShellReader::new(WindowsHost::new(runner.clone()))),
            Box::new(FilePathReader::new(PowerShellFileDrop::new(
                WindowsHost::new(runner),
            ))),
        ],
        Os::Linux if platform.is_wsl => wsl_readers(platform, runner),
        Os::Linux => match platform.display_server {
            DisplayServer::Wayland => vec![
                Box::new(WlPasteReader::new(runner.clone())),
                Box::new(XclipReader::new(runner.clone())),
                Box::new(FilePathReader::new(WlPasteUriList::new(runner))),
            ],
            // Unknown display server on native Linux: X11 first, Wayland as cross-check
            DisplayServer::X11 | DisplayServer::Unknown => vec![
                Box::new(XclipReader::new(runner.clone())),
                Box::new(WlPasteReader::new(runner.clone())),
                Box::new(FilePathReader::new(XclipUriList::new(runner))),
            ],
        },
    };

    let chain = FallbackChain::new(readers);
    log::info!(
        "Clipboard reader chain for {}: {}",
        platform,
        chain.member_names().join(" -> ")
    );
    chain
}

fn wsl_readers(
    platform: &PlatformDescriptor,
    runner: Arc<dyn CommandRunner>,
) -> Vec<Box<dyn ClipboardReader>> {
    let powershell = platform
        .shell_interop_path
        .as_deref()
        .unwrap_or(DEFAULT_WSL_POWERSHELL);
    let interop_raw = || boxed(PowerShellReader::new(WslHost::new(runner.clone(), powershell)));
    let interop_file = || {
        boxed(FilePathReader::new(PowerShellFileDrop::new(WslHost::new(
            runner.clone(),
            powershell,
        ))))
    };

    let native: Option<(Box<dyn ClipboardReader>, Box<dyn ClipboardReader>)> =
        match platform.display_server {
            DisplayServer::X11 => Some((
                boxed(XclipReader::new(runner.clone())),
                boxed(FilePathReader::new(XclipUriList::new(runner.clone()))),
            )),
            DisplayServer::Wayland => Some((
                boxed(WlPasteReader::new(runner.clone())),
                boxed(FilePathReader::new(WlPasteUriList::new(runner.clone()))),
            )),
            DisplayServer::Unknown => None,
        };

    match native {
        // WSLg bridges the Linux tools to the Windows clipboard, so they go first
        Some((native_raw, native_file)) if platform.has_gui_interop => {
            vec![native_raw, interop_raw(), native_file, interop_file()]
        }
        Some((native_raw, native_file)) => {
            vec![interop_raw(), native_raw, interop_file(), native_file]
        }
        None => vec![interop_raw(), interop_file()],
    }
}

fn boxed<R: ClipboardReader + 'static>(reader: R) -> Box<dyn ClipboardReader> {
    Box::new(reader)
}
