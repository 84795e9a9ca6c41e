mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fixit-cli")]
#[command(about = "Fixit CLI - Seed content, verify questions, and check solutions", long_about = None)]
struct Cli {
    /// Directory holding levels.json, questions.json and achievements.json
    #[arg(long, global = true, default_value = "content")]
    content_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the content files into Redis, replacing what is there
    Seed,

    /// Run every question's fixedCode against its own test cases
    Verify,

    /// Check a solution file against one question
    Check {
        /// Game mode (quickFire or career)
        #[arg(short, long)]
        mode: String,

        /// Level id
        #[arg(short, long)]
        level: u32,

        /// Question id within the level
        #[arg(short, long)]
        question: u32,

        /// JavaScript file with the fixed code
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Play a whole level from a directory of `<questionId>.js` solutions
    Play {
        /// Game mode (quickFire or career)
        #[arg(short, long)]
        mode: String,

        /// Level id
        #[arg(short, long)]
        level: u32,

        /// Directory containing one solution file per question
        #[arg(short, long)]
        dir: PathBuf,

        /// Record solved questions for this user in Redis
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed => {
            commands::seed(&cli.content_dir).await?;
        }
        Commands::Verify => {
            commands::verify(&cli.content_dir)?;
        }
        Commands::Check {
            mode,
            level,
            question,
            file,
        } => {
            commands::check_file(&cli.content_dir, &mode, level, question, &file)?;
        }
        Commands::Play {
            mode,
            level,
            dir,
            user,
        } => {
            commands::play(&cli.content_dir, &mode, level, &dir, user.as_deref()).await?;
        }
    }

    Ok(())
}
