use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use profile_scribe::config::Config;
use profile_scribe::errors::ErrorLog;
use profile_scribe::form::{self, FormSubmission};
use profile_scribe::gemini::GeminiClient;
use profile_scribe::generator::{self, SubmissionController};
use profile_scribe::links::{self, NormalizedLink};
use profile_scribe::profile::ProfileField;

#[derive(Parser)]
#[command(name = "profile-scribe")]
#[command(about = "Turns plain profile text into copy-pasteable BNI Connect HTML")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate profile HTML from a submission file
    Generate {
        /// Path to the submission file
        #[arg(short, long, default_value = "profile.yaml")]
        input: PathBuf,

        /// Path to config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create a starter submission file
    New {
        /// Where to write the file
        #[arg(default_value = "profile.yaml")]
        path: PathBuf,
    },
    /// Print the prompt that would be sent to the model
    Prompt {
        /// Path to the submission file
        #[arg(short, long, default_value = "profile.yaml")]
        input: PathBuf,

        /// Path to config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
    /// Show the direct image URL for a Dropbox or Imgur share link
    Normalize {
        url: String,
    },
    /// Print one field's raw HTML from the last generation
    Copy {
        /// Field key, e.g. myBusiness
        #[arg(short, long)]
        field: String,

        /// Path to config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Output directory of the previous run (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { input, config, output } => {
            generate_profile(input, config, output).await?;
        }
        Commands::New { path } => {
            form::write_starter(&path)?;
            println!("{}", "Submission file created.".green().bold());
            println!("  Fill in {} and run {}", path.display().to_string().cyan(), "profile-scribe generate".yellow());
        }
        Commands::Prompt { input, config } => {
            let config = Config::load(&config)
                .context("Failed to load configuration")?;
            let form = FormSubmission::load(&input)?;
            println!("{}", generator::build_request(&config, &form).prompt);
        }
        Commands::Normalize { url } => match links::normalize(&url) {
            NormalizedLink::Direct(direct) => println!("{}", direct),
            NormalizedLink::Unsupported => {
                eprintln!("{}", format!("Unsupported link: {}", url).red());
                eprintln!("{}", "Use a public Dropbox file link or a single Imgur image.".yellow());
                process::exit(1);
            }
        },
        Commands::Copy { field, config, output } => {
            let config = Config::load(&config)
                .context("Failed to load configuration")?;
            let output_dir = output.unwrap_or_else(|| PathBuf::from(&config.output_dir));
            let Some(field) = ProfileField::from_key(&field) else {
                let keys: Vec<&str> = ProfileField::ALL.iter().map(|f| f.key()).collect();
                eprintln!("{}", format!("Error: Unknown field '{}'. Expected one of: {}", field, keys.join(", ")).red());
                process::exit(1);
            };
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = generator::copy_field(&output_dir, field, &mut stdout) {
                let mut errors = ErrorLog::new();
                errors.push(e);
                if let Some(message) = errors.display() {
                    eprintln!("{}", message.red());
                }
                process::exit(1);
            }
        }
    }

    Ok(())
}

async fn generate_profile(input: PathBuf, config_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let config = Config::load(&config_path)
        .context("Failed to load configuration")?;
    let form = FormSubmission::load(&input)?;
    let output_dir = output.unwrap_or_else(|| PathBuf::from(&config.output_dir));

    let client = match GeminiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            let mut errors = ErrorLog::new();
            errors.push(e);
            if let Some(message) = errors.display() {
                eprintln!("{}", message.red());
            }
            eprintln!("{}", "Set GEMINI_API_KEY (or API_KEY) in the environment or a .env file.".yellow());
            process::exit(1);
        }
    };

    let generator = SubmissionController::new(client, config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Generating...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let report = generator.submit(&form).await;
    spinner.finish_and_clear();

    generator::write_outputs(&report, &output_dir)?;

    if report.merged.is_some() {
        println!("{}", "Profile HTML generated".green().bold());
    }
    generator::print_summary(&report);
    println!("{}", format!("Preview: {}", output_dir.join("index.html").display()).blue());

    if report.errors.preview_failed() {
        process::exit(1);
    }
    Ok(())
}
