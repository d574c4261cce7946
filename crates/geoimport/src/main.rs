use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use geoimport_core::{berlin, config::DbConfig, db, fetch::HttpReader, plz, postgis::PostgisWriter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Geospatial dataset importer for PostGIS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import the Berlin open-data layers (districts, postal codes,
    /// traffic cells, population density, land values)
    Berlin,
    /// Normalize a local PLZ GeoJSON and load it with population counts
    PlzPop(PlzPopArgs),
}

#[derive(Args, Debug)]
struct PlzPopArgs {
    /// Path to the PLZ GeoJSON file
    #[arg(long, default_value = plz::DEFAULT_PATH)]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = DbConfig::from_env();
    let pool = db::connect_lazy(&config.url())?;
    let writer = PostgisWriter::new(pool);

    match cli.command {
        Command::Berlin => {
            let reader = HttpReader::new();
            berlin::run(&reader, &writer, &berlin::datasets()).await;
            println!("Done!");
        }
        Command::PlzPop(args) => {
            plz::run(&writer, &args.file).await?;
            println!("Done! Table has been created in the database.");
            println!("You can now run SQL queries such as:");
            println!("SELECT plz, einwohner FROM {} LIMIT 10;", plz::TABLE);
        }
    }

    Ok(())
}
