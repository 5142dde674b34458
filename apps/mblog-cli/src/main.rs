//! Offline utility for the post store.
//!
//! Talks to the database named by `DATABASE_URL`; the schema must already be
//! migrated (see the `migration` binary).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use mblog_core::PostStore;
use mblog_core::domain::NewPost;
use mblog_infra::dump::{self, DEFAULT_DUMP_FILE};
use mblog_infra::{DatabaseConfig, PostgresPostRepository};

#[derive(Debug, Parser)]
#[command(name = "mblog-cli", version, about = "Manage mblog posts offline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a post and print its slug.
    Create(CreateArgs),
    /// Write every post to a JSON file.
    Dump {
        /// Output file.
        #[arg(short, long, default_value = DEFAULT_DUMP_FILE)]
        output: PathBuf,
        /// Pretty-print with this many spaces of indentation.
        #[arg(long)]
        indent: Option<usize>,
    },
    /// Load posts from a JSON dump.
    Load {
        /// Dump file to read.
        #[arg(default_value = DEFAULT_DUMP_FILE)]
        input: PathBuf,
    },
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(long)]
    title: String,
    /// Post body.
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,
    /// Read the body from a file.
    #[arg(long)]
    body_file: Option<PathBuf>,
    /// Explicit slug; derived from the title when omitted.
    #[arg(long)]
    slug: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,mblog_infra=info")),
        )
        .init();

    let cli = Cli::parse();
    let store = open_store().await?;

    match cli.command {
        Command::Create(args) => {
            let body = read_body(&args).await?;
            let new_post = NewPost {
                title: args.title,
                body,
                slug: args.slug,
            };
            let post = store.create(new_post).await?;
            println!("{}", post.slug);
        }
        Command::Dump { output, indent } => {
            let count = dump::export_to_path(&store, &output, indent).await?;
            println!("Wrote {count} posts to {}", output.display());
        }
        Command::Load { input } => {
            let count = dump::import_from_path(&store, &input).await?;
            println!("Loaded {count} posts from {}", input.display());
        }
    }

    Ok(())
}

async fn open_store() -> Result<PostStore> {
    let config = DatabaseConfig::from_env().context("DATABASE_URL must be set")?;
    let conn = mblog_infra::connect(&config)
        .await
        .context("connecting to the database")?;

    Ok(PostStore::new(Arc::new(PostgresPostRepository::new(conn))))
}

async fn read_body(args: &CreateArgs) -> Result<String> {
    match (&args.body, &args.body_file) {
        (Some(body), _) => Ok(body.clone()),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        (None, None) => bail!("either --body or --body-file is required"),
    }
}
