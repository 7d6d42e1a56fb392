//! Administrative commands run against the Foodgram database

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram::db::{self, ingredients::LoadSummary};
use foodgram::models::ingredient::parse_reference_line;
use foodgram::models::IngredientCreate;
use foodgram::{open_database, Config};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load ingredient reference data from a `name,unit` file
    LoadIngredients { path: PathBuf },
    /// Give a user staff rights (tag and ingredient management)
    GrantStaff { email: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let pool = open_database(&config.database_path).await?;

    match args.command {
        Command::LoadIngredients { path } => {
            let records = read_reference_file(&path).await?;

            let mut tx = db::begin_write(&pool).await?;
            let LoadSummary { created, skipped } =
                db::ingredients::load_reference_data(&mut tx, &records).await?;
            tx.commit().await?;

            tracing::info!(
                "Loaded {}: {} created, {} already present",
                path.display(),
                created,
                skipped
            );
        }
        Command::GrantStaff { email } => {
            let mut conn = pool.acquire().await?;
            if !db::users::grant_staff(&mut conn, &email).await? {
                bail!("no user with email {email}");
            }
            tracing::info!("Granted staff rights to {}", email);
        }
    }

    Ok(())
}

/// Parse every record up front so a bad line aborts before anything is written
async fn read_reference_file(path: &Path) -> anyhow::Result<Vec<IngredientCreate>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let mut records = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        match parse_reference_line(line) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => bail!("{}:{}: {}", path.display(), index + 1, e),
        }
    }
    Ok(records)
}
