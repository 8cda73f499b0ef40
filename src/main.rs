use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use streamer_upload::common::config::{apply_overrides, load_config, ConfigOverrides};
use streamer_upload::common::config_commands::{run_config_path, run_config_show};
use streamer_upload::common::{
    Credentials, FileDescriptor, FilesSelection, StructureSelection,
};
use streamer_upload::output;
use streamer_upload::protocol::HttpUploadClient;
use streamer_upload::upload::{Orchestrator, UploadStatus};

const PASSWORD_ENV: &str = "STREAMER_UPLOAD_PASSWORD";

#[derive(Parser)]
#[command(name = "streamer-upload")]
#[command(version)]
#[command(about = "Upload raw data files into project storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files into one project/subject/session/data type
    Upload(UploadArgs),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the config file, or the defaults when it does not exist
    Show,
}

#[derive(Args)]
struct UploadArgs {
    #[arg(long, help = "Project number, e.g. 3010000.01")]
    project: String,
    #[arg(long, help = "Subject label")]
    subject: String,
    #[arg(long, help = "Session label")]
    session: String,
    #[arg(long = "data-type", help = "Data type, e.g. eeg")]
    data_type: String,
    #[arg(long, help = "Account name (defaults to $USER)")]
    username: Option<String>,
    #[arg(long, help = "Upload service URL")]
    server: Option<String>,
    #[arg(long, help = "Files transferred at once")]
    concurrency: Option<usize>,
    #[arg(short, long, help = "Overwrite existing or empty files without asking")]
    yes: bool,
    #[arg(required = true, help = "Files to upload")]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Upload(args) => run_upload(args).await,
        Commands::Config { command } => match command {
            ConfigCommand::Path => run_config_path(),
            ConfigCommand::Show => run_config_show(),
        },
    };

    if let Err(err) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), err);
        std::process::exit(1);
    }
}

async fn run_upload(args: UploadArgs) -> Result<()> {
    let overrides = ConfigOverrides {
        server_url: args.server.clone(),
        concurrency: args.concurrency,
    };
    let config = apply_overrides(load_config()?, &overrides)?;

    let structure = StructureSelection::new(
        &args.project,
        &args.subject,
        &args.session,
        &args.data_type,
    )?;

    let mut files = FilesSelection::new(config.max_file_size_bytes);
    for path in &args.files {
        let file = FileDescriptor::from_path(path)
            .await
            .with_context(|| format!("Cannot select {}", path.display()))?;
        files.add(file)?;
    }

    let credentials = Arc::new(read_credentials(args.username)?);

    println!(
        "Uploading {} file(s) ({} bytes) to {}",
        files.len(),
        files.total_size_bytes(),
        style(structure.project_storage_path(&config.project_root).display()).cyan()
    );

    let client = Arc::new(HttpUploadClient::from_config(&config));
    let mut orchestrator = Orchestrator::new(client, credentials, config.transfer);
    let renderer = tokio::spawn(output::render_updates(orchestrator.subscribe()));

    orchestrator.start(structure, files).await?;

    if orchestrator.status() == UploadStatus::Confirming {
        if let Some(validation) = &orchestrator.state().validation {
            output::print_conflicts(validation, &mut std::io::stderr())?;
        }

        let accepted = args.yes || {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            output::confirm("Overwrite these files?", &mut input, &mut std::io::stderr())?
        };

        if accepted {
            orchestrator.confirm().await?;
        } else {
            orchestrator.cancel()?;
        }
    }

    let state = orchestrator.state().clone();
    drop(orchestrator);
    renderer.await.context("Progress renderer stopped unexpectedly")?;

    match state.status {
        UploadStatus::Finished => {
            println!(
                "{} Uploaded {} file(s) in session {}",
                style("✓").green().bold(),
                state.uploaded_files.len(),
                state.upload_session_id.unwrap_or_default()
            );
            for name in &state.uploaded_files {
                println!("  {name}");
            }
            Ok(())
        }
        UploadStatus::Idle => {
            println!("Upload cancelled, nothing was transferred");
            Ok(())
        }
        _ => match state.error {
            Some(failure) if failure.files_transferred() => bail!(
                "{failure}. Files were transferred but the upload was not completed"
            ),
            Some(failure) => bail!("{failure}"),
            None => bail!("Upload stopped while {}", state.status),
        },
    }
}

fn read_credentials(username: Option<String>) -> Result<Credentials> {
    let username = match username.or_else(|| std::env::var("USER").ok()) {
        Some(name) if !name.trim().is_empty() => name,
        _ => bail!("No username given. Pass --username"),
    };

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            output::prompt_password(&username, &mut input, &mut std::io::stderr())?
        }
    };

    Ok(Credentials::new(username, password))
}
