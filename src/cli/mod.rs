use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    config,
    domain::{
        query::TrackQuery,
        vote::{VoteRecord, VoterId},
    },
    engine::promotion::PromotionReport,
    session::{self, Session},
    storage::ledger::SqliteLedger,
};

#[derive(Parser)]
#[command(name = "crowdlist")]
#[command(version = "0.1")]
#[command(about = "Crowd voting for a shared Spotify playlist")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Vote for a track, nominating it if nobody did yet
    Vote {
        /// Who is voting
        #[arg(short, long)]
        user: String,
        /// Spotify track link
        #[arg(long)]
        url: Option<String>,
        /// Track name, together with --artist
        #[arg(long)]
        name: Option<String>,
        /// Artist name, together with --name
        #[arg(long)]
        artist: Option<String>,
    },
    /// Show nominations of the display window
    Pending,
    /// Add every track above the vote threshold to the playlist
    Promote,
    /// Run http server taking votes
    Serve,
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::Config::load(&cli.config)?;
    let today = Local::now().date_naive();

    match &cli.command {
        Commands::Vote {
            user,
            url,
            name,
            artist,
        } => {
            let voter = VoterId::new(user).context("--user must not be empty")?;
            let query = TrackQuery::from_parts(url.as_deref(), name.as_deref(), artist.as_deref())?;

            let mut session = Session::connect(&cfg)?;
            let receipt = session.vote(&query, &voter, today)?;

            println!("Track found: {}", receipt.nomination.track);
            println!("{}", receipt.nomination.outcome.message());
            if let Some(record) = receipt.nomination.ledger.get(&receipt.nomination.track.url) {
                println!(
                    "{} now has {} vote(s), tracks with more than {} votes join the playlist",
                    record.name(),
                    record.votes(),
                    session.rules().promotion_threshold
                );
            }
            if let Some(report) = &receipt.promotions {
                print_promotions(report);
            }
            if let Some(err) = &receipt.promotion_error {
                println!("Vote saved, but promoting tracks failed: {err}");
            }
        }

        Commands::Pending => {
            let mut store = SqliteLedger::open(&cfg.database)?;
            let records = session::pending(&mut store, &cfg.playlist, today)?;

            if records.is_empty() {
                println!(
                    "No nominations in the last {} days",
                    cfg.playlist.display_window_days
                );
            }
            for record in &records {
                print_record(record);
            }
        }

        Commands::Promote => {
            let mut session = Session::connect(&cfg)?;
            let report = session.promote()?;
            if report.is_empty() {
                println!(
                    "No track has more than {} votes",
                    cfg.playlist.promotion_threshold
                );
            }
            print_promotions(&report);
        }

        Commands::Serve => {
            println!("Starting HTTP server...");

            let session = Session::connect(&cfg).context("Failed to initialize session")?;

            let http_server = crate::http::server::HttpServer::new(session, cfg.http);

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }
    }

    Ok(())
}

fn print_record(record: &VoteRecord) {
    println!(
        "  [{}]  {} - {} (added {})",
        record.votes(),
        record.name(),
        record.artist(),
        record.added_at()
    );
    println!("    {}", record.url());
}

fn print_promotions(report: &PromotionReport) {
    for record in &report.promoted {
        println!("Track successfully added to playlist: {} - {}", record.name(), record.artist());
    }
    for failure in &report.failed {
        println!(
            "Could not add {} - {} to the playlist, it stays nominated: {}",
            failure.record.name(),
            failure.record.artist(),
            failure.error
        );
    }
}
