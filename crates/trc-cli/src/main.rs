use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "trc")]
#[command(about = "Trade reconciliation: client orders vs broker trades", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest, reconcile, export and optionally persist one trading day
    Run(commands::run::RunArgs),

    /// Report whether each file holds client orders or broker trades
    Identify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> desk -> day overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Result database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Apply SQL migrations (creates the file if missing)
    Migrate {
        #[arg(long)]
        db: PathBuf,
    },

    /// Connectivity, schema presence and stored run count
    Status {
        #[arg(long)]
        db: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run(args) => {
            let summary = commands::run::execute(args).await?;
            summary.print();
        }

        Commands::Identify { files } => {
            for f in &files {
                let kind = trc_ingest::sniff_file(f)?;
                println!("{} kind={}", f.display(), kind.as_str());
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = trc_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Db { cmd } => match cmd {
            DbCmd::Migrate { db } => {
                let pool = trc_db::connect(&db).await?;
                trc_db::migrate(&pool).await?;
                println!("migrations_applied=true");
            }
            DbCmd::Status { db } => {
                let pool = trc_db::connect(&db).await?;
                let s = trc_db::status(&pool).await?;
                println!(
                    "db_ok={} has_runs_table={} run_count={}",
                    s.ok, s.has_runs_table, s.run_count
                );
            }
        },
    }

    Ok(())
}

// Logs go to stderr; stdout carries the key=value report.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
