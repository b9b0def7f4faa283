use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherflow", version, about = "Weather ingestion pipeline and read API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the read API; runs scheduled ingestion if INGEST_INTERVAL_SECS is set.
    Serve,

    /// Run a single ingestion cycle over all active cities and exit.
    Ingest,

    /// Load the upstream city list (JSON) into the cities table.
    ImportCities {
        /// Path to the city list file.
        file: PathBuf,

        /// Overwrite metadata of cities that already exist.
        #[arg(long = "override")]
        overwrite: bool,
    },
}
