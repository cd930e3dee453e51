use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cohort_analytics::config::{AppConfig, DbConfig};
use cohort_analytics::{Result, ToolError, db, pipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(error) = init_tracing() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => pipeline::run_analysis(&args.into_config()),
        Command::Queries(args) => {
            let config = args.db_config()?;
            db::run_queries(&config, &args.export_dir).await
        }
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Join, aggregate, chart, and export educational cohort data."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the file-based pipeline: join the input tables, export the
    /// aggregate report, and render the chart artifacts.
    Analyze(AnalyzeArgs),
    /// Run the analytical query catalog against the database and export the
    /// results.
    Queries(QueryArgs),
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Directory holding the four input tables.
    #[arg(long, default_value = "datasets")]
    input_dir: PathBuf,

    /// Directory receiving the rendered charts.
    #[arg(long, default_value = "charts")]
    chart_dir: PathBuf,

    /// Directory receiving the spreadsheet report.
    #[arg(long, default_value = "exports")]
    export_dir: PathBuf,
}

impl AnalyzeArgs {
    fn into_config(self) -> AppConfig {
        AppConfig {
            input_dir: self.input_dir,
            chart_dir: self.chart_dir,
            export_dir: self.export_dir,
        }
    }
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Database host.
    #[arg(long, default_value = "localhost")]
    db_host: String,

    /// Database port.
    #[arg(long, default_value_t = 5432)]
    db_port: u16,

    /// Database name.
    #[arg(long, default_value = "dv_project")]
    db_name: String,

    /// Database user.
    #[arg(long, default_value = "postgres")]
    db_user: String,

    /// Database password. Falls back to the DB_PASSWORD environment
    /// variable, which dotenv may populate from a local .env file.
    #[arg(long)]
    db_password: Option<String>,

    /// Directory receiving the query exports.
    #[arg(long, default_value = "exports")]
    export_dir: PathBuf,
}

impl QueryArgs {
    fn db_config(&self) -> Result<DbConfig> {
        let password = match &self.db_password {
            Some(password) => password.clone(),
            None => std::env::var("DB_PASSWORD").map_err(|_| ToolError::MissingDbPassword)?,
        };
        Ok(DbConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            database: self.db_name.clone(),
            user: self.db_user.clone(),
            password,
        })
    }
}
