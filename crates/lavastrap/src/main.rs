use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lavastrap_core::http::ReqwestFetcher;
use lavastrap_core::java::{RuntimeOutcome, ensure_java_runtime, normalize_runtime_dir};
use lavastrap_core::lavalink::{LavalinkOutcome, ensure_lavalink};
use lavastrap_core::layout::{
    LayoutOverrides, ResolutionContext, ResolvedLayout, inspect_layout, resolve_layout,
};
use lavastrap_core::ports::{PortOutcome, configure_ports};
use lavastrap_core::prompt::{TerminalPrompter, is_interrupted};
use lavastrap_core::propagate::propagate_configs;
use lavastrap_core::repository::{CheckoutOutcome, GitCli, ensure_checkout, update_checkout};
use lavastrap_core::secrets::{CredentialsOutcome, ensure_credentials};
use lavastrap_core::settings::InstallerSettings;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";
const INTERRUPTED_EXIT_CODE: u8 = 130;
const FAILURE_EXIT_CODE: u8 = 1;

#[derive(Debug, Parser)]
#[command(
    name = "lavastrap",
    version,
    about = "Bootstrap a Lava music bot node: checkout, secrets, ports, Java runtime and Lavalink"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Directory holding lava/, configs/, java/ and lavalink/"
    )]
    root: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved paths and endpoints")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    root: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            root: cli.root.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Commands {
    #[command(about = "Run every step in order (default)")]
    Setup,
    #[command(name = "clone", about = "Clone or update the Lava checkout")]
    Checkout,
    #[command(about = "Create .env from operator answers")]
    Secrets,
    #[command(about = "Write the Lavalink port into the prepared configs")]
    Ports,
    #[command(about = "Copy prepared configs into the checkout")]
    Propagate,
    #[command(about = "Install the Java runtime")]
    Java,
    #[command(about = "Download the Lavalink server")]
    Lavalink,
    #[command(about = "Report which artifacts are in place")]
    Status,
}

struct Installer {
    layout: ResolvedLayout,
    settings: InstallerSettings,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match run(&runtime, cli.command.unwrap_or(Commands::Setup)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if is_interrupted(&error) {
                warning("Interrupted, aborting setup");
            } else {
                eprintln!("Error: {error:?}");
            }
            ExitCode::from(failure_exit_code(&error))
        }
    }
}

fn failure_exit_code(error: &anyhow::Error) -> u8 {
    if is_interrupted(error) {
        INTERRUPTED_EXIT_CODE
    } else {
        FAILURE_EXIT_CODE
    }
}

fn run(runtime: &RuntimeOptions, command: Commands) -> Result<()> {
    let installer = resolve_installer(runtime)?;
    if runtime.diagnostics {
        println!(
            "[diagnostics]\n{}\n{}\n",
            installer.layout.diagnostics(),
            installer.settings.diagnostics()
        );
    }

    match command {
        Commands::Setup => run_setup(&installer),
        Commands::Checkout => run_clone(&installer),
        Commands::Secrets => run_secrets(&installer),
        Commands::Ports => run_ports(&installer),
        Commands::Propagate => run_propagate(&installer),
        Commands::Java => run_java(&installer),
        Commands::Lavalink => run_lavalink(&installer),
        Commands::Status => run_status(&installer),
    }
}

fn run_setup(installer: &Installer) -> Result<()> {
    run_clone(installer)?;
    run_secrets(installer)?;
    run_ports(installer)?;
    run_propagate(installer)?;
    run_java(installer)?;
    run_lavalink(installer)?;
    success("Setup complete!");
    Ok(())
}

fn run_clone(installer: &Installer) -> Result<()> {
    let mut git = GitCli;
    if !installer.layout.checkout_dir.exists() {
        info("Cloning Lava...");
    }
    match ensure_checkout(&installer.layout, &installer.settings, &mut git)? {
        CheckoutOutcome::Cloned => success("Lava cloned successfully!"),
        CheckoutOutcome::Existing => success("Lava checkout found"),
    }

    info("Updating Lava...");
    update_checkout(&installer.layout, &mut git)?;
    success("Lava updated successfully!");
    Ok(())
}

fn run_secrets(installer: &Installer) -> Result<()> {
    let env_file = &installer.layout.env_file;
    if !env_file.is_file() {
        info(".env file doesn't exist, creating one...");
    }
    let mut prompter = TerminalPrompter::stdio();
    match ensure_credentials(env_file, &mut prompter)? {
        CredentialsOutcome::AlreadyExists => warning(".env file already exists, skipping..."),
        CredentialsOutcome::Created { keys } => {
            success(&format!(".env file created successfully! ({})", keys.join(", ")))
        }
    }
    Ok(())
}

fn run_ports(installer: &Installer) -> Result<()> {
    let mut prompter = TerminalPrompter::stdio();
    match configure_ports(&installer.layout, &mut prompter)? {
        PortOutcome::Skipped => {
            warning("lavalink.json and application.yml file already exists, skipping...")
        }
        PortOutcome::Written { port } => success(&format!(
            "Wrote port {port} to lavalink.json and application.yml successfully!"
        )),
    }
    Ok(())
}

fn run_propagate(installer: &Installer) -> Result<()> {
    info("Setting up Lava...");
    let written = propagate_configs(&installer.layout)?;
    tracing::debug!(files = ?written, "propagated configs");
    success("Lava setup successfully!");
    Ok(())
}

fn run_java(installer: &Installer) -> Result<()> {
    info("Installing JDK...");
    let mut fetcher = ReqwestFetcher::new(&installer.settings)?;
    match ensure_java_runtime(&installer.layout, &installer.settings, &mut fetcher)? {
        RuntimeOutcome::Installed { release, archive } => {
            info(&format!("Extracted {release} from {archive}"))
        }
        RuntimeOutcome::AlreadyPresent => {}
        RuntimeOutcome::UnsupportedVersion => warning(&format!(
            "No Java {} runtime is published for this platform, skipping install...",
            installer.settings.java_version
        )),
    }
    if let Some(java_home) = normalize_runtime_dir(&installer.layout.java_root)? {
        info(&format!("Runtime available at {}", normalize_path(&java_home)));
    }
    if installer.layout.java_home.is_dir() {
        success("JDK installed successfully!");
    } else {
        warning(&format!(
            "{} is missing; Lavalink will need a Java runtime on PATH",
            normalize_path(&installer.layout.java_home)
        ));
    }
    Ok(())
}

fn run_lavalink(installer: &Installer) -> Result<()> {
    info("Installing Lavalink...");
    let mut fetcher = ReqwestFetcher::new(&installer.settings)?;
    match ensure_lavalink(&installer.layout, &installer.settings, &mut fetcher)? {
        LavalinkOutcome::AlreadyInstalled => {
            warning("Lavalink.jar already exists, skipping...")
        }
        LavalinkOutcome::Installed { tag, asset, bytes } => success(&format!(
            "Lavalink installed successfully! ({asset} {tag}, {bytes} bytes)"
        )),
    }
    Ok(())
}

fn run_status(installer: &Installer) -> Result<()> {
    let layout = &installer.layout;
    let status = inspect_layout(layout)?;

    println!("lavastrap status");
    println!("root: {}", normalize_path(&layout.root));
    println!("checkout_exists: {}", format_flag(status.checkout_exists));
    println!("env_file_exists: {}", format_flag(status.env_file_exists));
    println!(
        "env_file.keys: {}",
        if status.credential_keys.is_empty() {
            "<none>".to_string()
        } else {
            status.credential_keys.join(", ")
        }
    );
    println!("templates_exist: {}", format_flag(status.templates_exist));
    println!(
        "checkout.lavalink_json_exists: {}",
        format_flag(status.checkout_lavalink_json_exists)
    );
    println!(
        "checkout.icons_json_exists: {}",
        format_flag(status.checkout_icons_json_exists)
    );
    println!("java_root_exists: {}", format_flag(status.java_root_exists));
    println!("java_home_exists: {}", format_flag(status.java_home_exists));
    println!(
        "lavalink_jar_exists: {}",
        format_flag(status.lavalink_jar_exists)
    );
    println!(
        "lavalink_jar_bytes: {}",
        status
            .lavalink_jar_bytes
            .map(|size| size.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );
    println!(
        "lavalink_config_exists: {}",
        format_flag(status.lavalink_config_exists)
    );
    if !status.warnings.is_empty() {
        println!("warnings:");
        for warning in &status.warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}

fn resolve_installer(runtime: &RuntimeOptions) -> Result<Installer> {
    let context = ResolutionContext::from_process()?;
    let overrides = LayoutOverrides {
        root: runtime.root.clone(),
    };
    let layout = resolve_layout(&context, &overrides);
    if layout.env_file.is_file() {
        let _ = dotenvy::from_path(&layout.env_file);
    }

    Ok(Installer {
        layout,
        settings: InstallerSettings::from_env(),
    })
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
    {
        eprintln!("lavastrap: tracing initialization failed: {err}");
    }
}

fn info(message: &str) {
    println!("[\x1b[36mi\x1b[0m] {message}");
}

fn warning(message: &str) {
    println!("[\x1b[33m!\x1b[0m] {message}\n");
}

fn success(message: &str) {
    println!("[\x1b[32m+\x1b[0m] {message}\n");
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
