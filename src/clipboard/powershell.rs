//! PowerShell-based readers for Windows and for WSL via interop
//!
//! Both hosts run the same scripts. They differ only in which PowerShell they
//! launch and how a Windows path is turned into a locally readable one.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::backend::ClipboardReader;
use super::error::ClipboardError;
use super::file_path::PathListSource;
use super::format::{ClipboardImage, ImageFormat};
use crate::exec::{CommandRunner, ExecOptions, ToolPath};

const UTF8_OUTPUT: &str = "[Console]::OutputEncoding = [System.Text.Encoding]::UTF8;";

const CONTAINS_IMAGE_SCRIPT: &str = "Add-Type -AssemblyName System.Windows.Forms; \
if ([System.Windows.Forms.Clipboard]::ContainsImage()) { 'True' } else { 'False' }";

/// Saves the clipboard image as PNG under %TEMP% and prints the path
const SAVE_IMAGE_SCRIPT: &str = "Add-Type -AssemblyName System.Windows.Forms; \
Add-Type -AssemblyName System.Drawing; \
$img = [System.Windows.Forms.Clipboard]::GetImage(); \
if ($img -eq $null) { exit 0 }; \
$path = Join-Path ([System.IO.Path]::GetTempPath()) ('termpaste-' + [guid]::NewGuid().ToString() + '.png'); \
$img.Save($path, [System.Drawing.Imaging.ImageFormat]::Png); \
$img.Dispose(); \
Write-Output $path";

const FILE_DROP_SCRIPT: &str = "Add-Type -AssemblyName System.Windows.Forms; \
[System.Windows.Forms.Clipboard]::GetFileDropList() | ForEach-Object { Write-Output $_ }";

/// Where PowerShell runs and how its paths are reached
#[async_trait]
pub trait PowerShellHost: Send + Sync {
    fn name(&self) -> &'static str;

    /// Tag for the file drop list source on this host
    fn file_name(&self) -> &'static str;

    fn required_tool(&self) -> String;

    fn runner(&self) -> &dyn CommandRunner;

    /// PowerShell executable to launch
    fn program(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Turn a Windows path printed by PowerShell into a local path
    async fn to_local_path(&self, windows_path: &str) -> Result<PathBuf, ClipboardError>;
}

/// Native Windows: paths are already local
pub struct WindowsHost {
    runner: Arc<dyn CommandRunner>,
    tool: ToolPath,
}

impl WindowsHost {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        WindowsHost {
            runner,
            tool: ToolPath::new("powershell"),
        }
    }
}

#[async_trait]
impl PowerShellHost for WindowsHost {
    fn name(&self) -> &'static str {
        "powershell"
    }

    fn file_name(&self) -> &'static str {
        "powershell-file"
    }

    fn required_tool(&self) -> String {
        "PowerShell".to_string()
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn program(&self) -> &str {
        self.tool.program(self.runner.as_ref())
    }

    fn is_available(&self) -> bool {
        self.tool.is_available(self.runner.as_ref())
    }

    async fn to_local_path(&self, windows_path: &str) -> Result<PathBuf, ClipboardError> {
        Ok(PathBuf::from(windows_path))
    }
}

/// WSL: Windows PowerShell through interop, paths bridged with `wslpath`
pub struct WslHost {
    runner: Arc<dyn CommandRunner>,
    powershell: String,
}

impl WslHost {
    pub fn new(runner: Arc<dyn CommandRunner>, powershell: &str) -> Self {
        WslHost {
            runner,
            powershell: powershell.to_string(),
        }
    }
}

#[async_trait]
impl PowerShellHost for WslHost {
    fn name(&self) -> &'static str {
        "powershell-wsl"
    }

    fn file_name(&self) -> &'static str {
        "powershell-wsl-file"
    }

    fn required_tool(&self) -> String {
        "Windows PowerShell (WSL interop)".to_string()
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn program(&self) -> &str {
        &self.powershell
    }

    fn is_available(&self) -> bool {
        self.runner.which(&self.powershell).is_some()
    }

    async fn to_local_path(&self, windows_path: &str) -> Result<PathBuf, ClipboardError> {
        let translation_error = |reason: String| ClipboardError::PathTranslation {
            path: windows_path.to_string(),
            reason,
        };

        let output = self
            .runner
            .run("wslpath", &["-u", windows_path], &ExecOptions::text())
            .await
            .map_err(|e| translation_error(e.to_string()))?;

        let local = output.stdout.trim();
        if local.is_empty() {
            return Err(translation_error("wslpath printed nothing".to_string()));
        }
        Ok(PathBuf::from(local))
    }
}

/// Run a script on the host's PowerShell and return trimmed stdout
async fn run_script<H: PowerShellHost>(host: &H, script: &str) -> Result<String, ClipboardError> {
    let command = format!("{UTF8_OUTPUT} {script}");
    let output = host
        .runner()
        .run(
            host.program(),
            &["-NoProfile", "-NonInteractive", "-STA", "-Command", &command],
            &ExecOptions::text(),
        )
        .await
        .map_err(|e| ClipboardError::from_exec(host.name(), e))?;
    Ok(output.stdout.trim().to_string())
}

/// Delete a file on the Windows side, logging instead of failing
async fn remove_windows_file<H: PowerShellHost>(host: &H, windows_path: &str) {
    let script = format!(
        "Remove-Item -LiteralPath '{}' -Force",
        windows_path.replace('\'', "''")
    );
    if let Err(e) = run_script(host, &script).await {
        log::warn!("Failed to remove PowerShell temp file {}: {}", windows_path, e);
    }
}

/// Clipboard image reader over PowerShell's Windows Forms clipboard
/// Images are always re-encoded to PNG on the Windows side
pub struct PowerShellReader<H> {
    host: H,
}

impl<H: PowerShellHost> PowerShellReader<H> {
    pub fn new(host: H) -> Self {
        PowerShellReader { host }
    }

    async fn contains_image(&self) -> Result<bool, ClipboardError> {
        let answer = run_script(&self.host, CONTAINS_IMAGE_SCRIPT).await?;
        Ok(answer.eq_ignore_ascii_case("true"))
    }
}

#[async_trait]
impl<H: PowerShellHost> ClipboardReader for PowerShellReader<H> {
    fn name(&self) -> &'static str {
        self.host.name()
    }

    fn required_tool(&self) -> String {
        self.host.required_tool()
    }

    async fn is_tool_available(&self) -> bool {
        self.host.is_available()
    }

    async fn has_image(&self) -> Result<bool, ClipboardError> {
        match self.contains_image().await {
            Ok(found) => Ok(found),
            Err(e) => {
                log::debug!("{} ContainsImage probe failed: {}", self.host.name(), e);
                Ok(false)
            }
        }
    }

    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError> {
        if self.contains_image().await? {
            Ok(ImageFormat::Png)
        } else {
            Err(ClipboardError::NoImage)
        }
    }

    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError> {
        let windows_path = run_script(&self.host, SAVE_IMAGE_SCRIPT).await?;
        if windows_path.is_empty() {
            return Err(ClipboardError::NoImage);
        }

        let local = match self.host.to_local_path(&windows_path).await {
            Ok(local) => local,
            Err(e) => {
                remove_windows_file(&self.host, &windows_path).await;
                return Err(e);
            }
        };
        let data = tokio::fs::read(&local).await;

        if let Err(e) = tokio::fs::remove_file(&local).await {
            log::warn!("Failed to remove PowerShell temp file {:?}: {}", local, e);
        }

        let data = data.map_err(|source| ClipboardError::Io {
            path: local,
            source,
        })?;
        if data.is_empty() {
            return Err(ClipboardError::NoImage);
        }
        Ok(ClipboardImage::new(data, ImageFormat::Png))
    }
}

/// Path list from the Windows file drop list (Explorer copies)
pub struct PowerShellFileDrop<H> {
    host: H,
}

impl<H: PowerShellHost> PowerShellFileDrop<H> {
    pub fn new(host: H) -> Self {
        PowerShellFileDrop { host }
    }
}

#[async_trait]
impl<H: PowerShellHost> PathListSource for PowerShellFileDrop<H> {
    fn name(&self) -> &'static str {
        self.host.file_name()
    }

    fn required_tool(&self) -> String {
        self.host.required_tool()
    }

    async fn is_tool_available(&self) -> bool {
        self.host.is_available()
    }

    async fn list_paths(&self) -> Result<Vec<PathBuf>, ClipboardError> {
        let listing = run_script(&self.host, FILE_DROP_SCRIPT).await?;
        let mut paths = Vec::new();
        for line in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match self.host.to_local_path(line).await {
                Ok(path) => paths.push(path),
                Err(e) => log::debug!("Skipping file drop entry: {}", e),
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::file_path::FilePathReader;
    use crate::exec::scripted::{Reply, ScriptedRunner};

    const WSL_POWERSHELL: &str = "/mnt/c/Windows/System32/WindowsPowerShell/v1.0/powershell.exe";

    fn script_contains(marker: &'static str) -> impl Fn(&[String]) -> bool {
        move |args| args.last().is_some_and(|s| s.contains(marker))
    }

    #[tokio::test]
    async fn test_windows_probe_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("termpaste-1234.png");
        std::fs::write(&saved, b"\x89PNGwin").unwrap();
        let saved_str = saved.to_string_lossy().into_owned();

        let runner = Arc::new(ScriptedRunner::new().with_tool("powershell", "powershell.exe"));
        runner.on("powershell.exe", script_contains("ContainsImage"), Reply::text("True\r\n"));
        runner.on(
            "powershell.exe",
            script_contains("GetImage"),
            Reply::text(&format!("{saved_str}\r\n")),
        );

        let reader = PowerShellReader::new(WindowsHost::new(runner.clone()));
        assert!(reader.is_tool_available().await);
        assert!(reader.has_image().await.unwrap());
        assert_eq!(reader.detect_format().await.unwrap(), ImageFormat::Png);

        let image = reader.read_image().await.unwrap();
        assert_eq!(image.data, b"\x89PNGwin");
        assert!(!saved.exists(), "temp PNG should be deleted after reading");

        let (_, args) = runner.calls()[0].clone();
        assert_eq!(&args[..4], ["-NoProfile", "-NonInteractive", "-STA", "-Command"]);
    }

    #[tokio::test]
    async fn test_probe_false_means_no_image() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on("powershell", script_contains("ContainsImage"), Reply::text("False"));
        runner.on("powershell", script_contains("GetImage"), Reply::text(""));

        let reader = PowerShellReader::new(WindowsHost::new(runner));
        assert!(!reader.has_image().await.unwrap());
        assert!(reader.detect_format().await.unwrap_err().is_no_image());
        assert!(reader.read_image().await.unwrap_err().is_no_image());
    }

    #[tokio::test]
    async fn test_wsl_translates_temp_path() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("termpaste-abc.png");
        std::fs::write(&local, b"\x89PNGwsl").unwrap();
        let local_str = local.to_string_lossy().into_owned();

        let runner = Arc::new(ScriptedRunner::new().with_tool(WSL_POWERSHELL, WSL_POWERSHELL));
        runner.on(
            WSL_POWERSHELL,
            script_contains("GetImage"),
            Reply::text("C:\\Users\\me\\AppData\\Local\\Temp\\termpaste-abc.png\r\n"),
        );
        runner.on(
            "wslpath",
            |args| args == ["-u", "C:\\Users\\me\\AppData\\Local\\Temp\\termpaste-abc.png"],
            Reply::text(&format!("{local_str}\n")),
        );

        let reader = PowerShellReader::new(WslHost::new(runner, WSL_POWERSHELL));
        assert_eq!(reader.name(), "powershell-wsl");
        let windows_drop = PowerShellFileDrop::new(WindowsHost::new(Arc::new(ScriptedRunner::new())));
        assert_eq!(windows_drop.name(), "powershell-file");
        assert!(reader.is_tool_available().await);
        let image = reader.read_image().await.unwrap();
        assert_eq!(image.data, b"\x89PNGwsl");
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn test_wsl_translation_failure_is_distinct() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            WSL_POWERSHELL,
            script_contains("GetImage"),
            Reply::text("C:\\Temp\\termpaste-x.png"),
        );
        runner.on("wslpath", |_| true, Reply::fail(1, "wslpath: invalid argument"));

        let reader = PowerShellReader::new(WslHost::new(runner, WSL_POWERSHELL));
        let err = reader.read_image().await.unwrap_err();
        match err {
            ClipboardError::PathTranslation { path, reason } => {
                assert_eq!(path, "C:\\Temp\\termpaste-x.png");
                assert!(reason.contains("invalid argument"));
            }
            other => panic!("expected PathTranslation, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_wsl_translation_failure_removes_windows_temp() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            WSL_POWERSHELL,
            script_contains("GetImage"),
            Reply::text("C:\\Temp\\it's-termpaste-x.png"),
        );
        runner.on("wslpath", |_| true, Reply::fail(1, "wslpath: invalid argument"));
        runner.on(WSL_POWERSHELL, script_contains("Remove-Item"), Reply::text(""));

        let reader = PowerShellReader::new(WslHost::new(runner.clone(), WSL_POWERSHELL));
        let err = reader.read_image().await.unwrap_err();
        assert!(matches!(err, ClipboardError::PathTranslation { .. }));

        let (program, args) = runner.calls().pop().unwrap();
        assert_eq!(program, WSL_POWERSHELL);
        assert!(
            args.last()
                .unwrap()
                .ends_with("Remove-Item -LiteralPath 'C:\\Temp\\it''s-termpaste-x.png' -Force")
        );
    }

    #[tokio::test]
    async fn test_failed_windows_cleanup_keeps_translation_error() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            WSL_POWERSHELL,
            script_contains("GetImage"),
            Reply::text("C:\\Temp\\termpaste-y.png"),
        );
        runner.on("wslpath", |_| true, Reply::fail(1, "wslpath: invalid argument"));
        runner.on(WSL_POWERSHELL, script_contains("Remove-Item"), Reply::fail(1, "access denied"));

        let reader = PowerShellReader::new(WslHost::new(runner.clone(), WSL_POWERSHELL));
        let err = reader.read_image().await.unwrap_err();
        assert!(matches!(err, ClipboardError::PathTranslation { .. }));
        assert_eq!(runner.call_count(WSL_POWERSHELL), 2);
    }

    #[tokio::test]
    async fn test_wsl_file_drop_skips_untranslatable_entries() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("photo.jpg");
        std::fs::write(&local, b"\xff\xd8").unwrap();
        let local_str = local.to_string_lossy().into_owned();

        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            WSL_POWERSHELL,
            script_contains("GetFileDropList"),
            Reply::text("\\\\server\\share\\a.png\r\nC:\\Users\\me\\photo.jpg\r\n"),
        );
        runner.on(
            "wslpath",
            |args| args[1].starts_with("\\\\"),
            Reply::fail(1, "unsupported"),
        );
        runner.on("wslpath", |_| true, Reply::text(&local_str));

        let reader = FilePathReader::new(PowerShellFileDrop::new(WslHost::new(runner, WSL_POWERSHELL)));
        assert_eq!(reader.name(), "powershell-wsl-file");
        let image = reader.read_image().await.unwrap();
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert_eq!(image.data, b"\xff\xd8");
    }
}
