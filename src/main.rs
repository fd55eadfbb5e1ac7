use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use termpaste::clipboard::{ClipboardReader, create_reader};
use termpaste::exec::{CommandRunner, SystemRunner};
use termpaste::image::ImageConverter;
use termpaste::logging;
use termpaste::paste::{PasteOutcome, PasteService};
use termpaste::platform::{PlatformCache, PlatformDescriptor};
use termpaste::storage::{
    Config, ConfigStorage, FolderImageStore, TomlConfigStorage, ensure_directories,
};
use termpaste::terminal::{self, ShellDialect, StdoutSink, TerminalSink, detect_shell};

#[derive(Parser)]
#[command(name = "termpaste")]
#[command(about = "Paste clipboard images into the terminal as quoted file paths", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the clipboard image and print its quoted path
    Paste {
        #[command(flatten)]
        target: Target,
    },

    /// Save dropped image files and print their quoted paths
    Drop {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        target: Target,
    },

    /// Quote a path for a shell
    Quote {
        path: PathBuf,

        /// Shell name or executable path (default: $SHELL)
        #[arg(long)]
        shell: Option<String>,
    },

    /// Show the detected platform and clipboard tools
    Doctor,
}

#[derive(clap::Args)]
struct Target {
    /// Workspace the image folder is created in (default: current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Shell executable of the receiving terminal
    #[arg(long)]
    shell: Option<String>,

    /// Send a newline after the path
    #[arg(long)]
    newline: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let platform_cache = PlatformCache::system();

    match cli.command {
        Commands::Paste { target } => {
            let config = load_config()?;
            let platform = platform_cache.get();
            log::debug!("Platform: {}", platform);
            cmd_paste(&config, platform, &target).await
        }
        Commands::Drop { files, target } => {
            let config = load_config()?;
            let platform = platform_cache.get();
            log::debug!("Platform: {}", platform);
            cmd_drop(&config, platform, &files, &target).await
        }
        Commands::Quote { path, shell } => {
            init_stderr_logging("warn")?;
            cmd_quote(&platform_cache.get(), &path, shell.as_deref())
        }
        Commands::Doctor => {
            init_stderr_logging("warn")?;
            cmd_doctor(&platform_cache.get()).await
        }
    }
}

/// Resolve directories, read the config file and start logging
fn load_config() -> Result<Config> {
    let (data_dir, config_dir) = ensure_directories()?;
    let config = TomlConfigStorage::new(config_dir.join("termpaste.toml")).load()?;
    init_logging(&config, &data_dir)?;
    Ok(config)
}

fn init_stderr_logging(default_level: &str) -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init()
        .context("Failed to initialize logger")
}

fn init_logging(config: &Config, data_dir: &Path) -> Result<()> {
    if config.logging.log_to_file {
        logging::init_logger(
            &data_dir.join("termpaste.log"),
            &config.logging.file_level,
            &config.logging.stderr_level,
        )
    } else {
        init_stderr_logging(&config.logging.stderr_level)
    }
}

fn build_service(
    config: &Config,
    platform: Arc<PlatformDescriptor>,
    target: &Target,
) -> Result<PasteService> {
    let workspace = match &target.workspace {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("Failed to resolve current directory")?,
    };
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let store = FolderImageStore::new(
        &workspace,
        &config.general.folder_name,
        config.general.max_images,
    );

    Ok(PasteService::new(
        Box::new(create_reader(&platform, runner.clone())),
        ImageConverter::new(runner),
        Arc::new(store),
        platform,
        config.general.save_format,
    ))
}

fn dialect_for(platform: &PlatformDescriptor, shell: Option<&str>) -> ShellDialect {
    let shell_env = env::var("SHELL").ok();
    detect_shell(shell, shell_env.as_deref(), platform.os)
}

async fn cmd_paste(
    config: &Config,
    platform: Arc<PlatformDescriptor>,
    target: &Target,
) -> Result<()> {
    let dialect = dialect_for(&platform, target.shell.as_deref());
    let service = build_service(config, platform, target)?;

    match service.paste().await? {
        PasteOutcome::Saved(saved) => {
            terminal::insert_path(
                &mut StdoutSink,
                &saved.path,
                dialect,
                target.newline || config.general.send_newline,
            )?;
            Ok(())
        }
        PasteOutcome::NoImage => {
            eprintln!("No image on the clipboard.");
            Ok(())
        }
        PasteOutcome::ToolMissing { required, .. } => {
            anyhow::bail!("No clipboard tool available. Install {}", required)
        }
    }
}

async fn cmd_drop(
    config: &Config,
    platform: Arc<PlatformDescriptor>,
    files: &[PathBuf],
    target: &Target,
) -> Result<()> {
    let dialect = dialect_for(&platform, target.shell.as_deref());
    let service = build_service(config, platform, target)?;

    let mut quoted = Vec::new();
    let mut failures = 0;
    for result in service.ingest_dropped(files).await {
        match result {
            Ok(saved) => quoted.push(terminal::quote_fs_path(&saved.path, dialect)?),
            Err(e) => {
                eprintln!("{}", e);
                failures += 1;
            }
        }
    }

    if !quoted.is_empty() {
        let mut sink = StdoutSink;
        sink.send_text(
            &quoted.join(" "),
            target.newline || config.general.send_newline,
        )?;
    }
    if quoted.is_empty() && failures > 0 {
        anyhow::bail!("None of the dropped files could be saved");
    }
    Ok(())
}

fn cmd_quote(platform: &PlatformDescriptor, path: &Path, shell: Option<&str>) -> Result<()> {
    let dialect = dialect_for(platform, shell);
    println!("{}", terminal::quote_fs_path(path, dialect)?);
    Ok(())
}

async fn cmd_doctor(platform: &Arc<PlatformDescriptor>) -> Result<()> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let chain = create_reader(platform, runner);

    println!("termpaste doctor");
    println!("================");
    println!("Platform: {}", platform);
    if platform.uses_windows_clipboard() {
        let powershell = platform.shell_interop_path.as_deref().unwrap_or("powershell");
        println!("PowerShell: {}", powershell);
    }
    println!("Shell: {}", dialect_for(platform, None));
    println!();
    println!("Clipboard readers (in order):");

    for (i, reader) in chain.members().iter().enumerate() {
        let status = if reader.is_tool_available().await {
            "available"
        } else {
            "missing"
        };
        println!(
            "{:3}. {:<20} {:<9} {}",
            i + 1,
            reader.name(),
            status,
            reader.required_tool()
        );
    }

    match chain.has_image().await {
        Ok(true) => println!("\nClipboard holds an image."),
        Ok(false) => println!("\nNo image on the clipboard."),
        Err(e) => println!("\nClipboard check failed: {}", e),
    }

    Ok(())
}
