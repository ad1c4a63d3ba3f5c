use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use netify::{
    parse_playlist_url, preview, NeteaseClient, PlaylistMigrator, SpotifyClient, TokioSleeper,
    TransferConfig, TransferOptions, TransferOutcome,
};

/// How many tracks the preview command lists before cutting off.
const PREVIEW_LIMIT: usize = 50;

#[derive(Parser)]
#[command(name = "netify")]
#[command(about = "Migrate NetEase Cloud Music playlists to Spotify")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a playlist's title, cover and track list without transferring
    Preview {
        /// NetEase playlist URL or numeric ID
        url: String,
    },

    /// Transfer a playlist to Spotify
    Transfer {
        /// NetEase playlist URL or numeric ID
        url: String,

        /// Name for the created Spotify playlist (default: "<title> (NetEase)")
        #[arg(long)]
        name: Option<String>,

        /// Description for the created playlist
        #[arg(long)]
        description: Option<String>,

        /// Cover image to upload instead of the source playlist's cover
        #[arg(long)]
        cover_url: Option<String>,

        /// Spotify access token (or set SPOTIFY_TOKEN env var)
        #[arg(long, env = "SPOTIFY_TOKEN")]
        token: String,
    },

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Preview { url } => {
            preview_playlist(&url).await?;
        }
        Commands::Transfer {
            url,
            name,
            description,
            cover_url,
            token,
        } => {
            transfer_playlist(&url, name, description, cover_url, &token).await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

async fn preview_playlist(url: &str) -> Result<()> {
    println!("{}", "NetEase Playlist Preview".cyan().bold());
    println!("{}", "=".repeat(50));

    let playlist_id = parse_playlist_url(url).context("Failed to parse playlist URL")?;
    let netease = NeteaseClient::new();
    let config = TransferConfig::default();
    let sleeper = TokioSleeper;

    let result = preview(&netease, &config, &sleeper, playlist_id, PREVIEW_LIMIT)
        .await
        .context("Failed to fetch playlist")?;

    println!("Title: {}", result.title.green());
    if let Some(cover) = &result.cover_url {
        println!("Cover: {}", cover);
    }
    println!("Tracks: {}", result.total_tracks);
    println!();

    for (i, track) in result.tracks.iter().enumerate() {
        println!("{:3}. {} - {}", i + 1, track.title, track.artists.join(", "));
    }
    if result.total_tracks > result.tracks.len() {
        println!(
            "\n{}",
            format!("... and {} more", result.total_tracks - result.tracks.len()).cyan()
        );
    }

    Ok(())
}

async fn transfer_playlist(
    url: &str,
    name: Option<String>,
    description: Option<String>,
    cover_url: Option<String>,
    token: &str,
) -> Result<()> {
    println!("{}", "NetEase to Spotify Playlist Migrator".cyan().bold());
    println!("{}", "=".repeat(50));

    let playlist_id = parse_playlist_url(url).context("Failed to parse playlist URL")?;

    let netease = NeteaseClient::new();
    let spotify = SpotifyClient::new(token);
    let sleeper = TokioSleeper;
    let migrator = PlaylistMigrator::new(&netease, &spotify, TransferConfig::default(), &sleeper);

    let options = TransferOptions {
        name,
        description,
        cover_url,
    };

    let outcome = migrator
        .transfer(playlist_id, &options)
        .await
        .context("Transfer failed")?;

    save_outcome(&outcome)?;
    print_summary(&outcome);

    Ok(())
}

fn save_outcome(outcome: &TransferOutcome) -> Result<()> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let results_dir = Path::new("migration_results");

    fs::create_dir_all(results_dir)?;

    let filename = results_dir.join(format!("transfer_{}.json", timestamp));
    let json = serde_json::to_string_pretty(outcome)?;

    fs::write(&filename, json)?;

    info!("Transfer report saved to: {}", filename.display());

    Ok(())
}

fn print_summary(outcome: &TransferOutcome) {
    println!();
    println!("{}", "=".repeat(60));
    println!("{}", "TRANSFER SUMMARY".bold());
    println!("{}", "=".repeat(60));
    println!("Playlist: {}", outcome.playlist_url.green());
    println!("Total tracks: {}", outcome.total_tracks);
    println!(
        "Transferred: {}",
        outcome.transferred.len().to_string().green()
    );
    println!("Missing: {}", outcome.missing.len().to_string().red());

    let status = if outcome.success_rate >= 90.0 {
        format!("{:.1}%", outcome.success_rate).green()
    } else if outcome.success_rate >= 70.0 {
        format!("{:.1}%", outcome.success_rate).yellow()
    } else {
        format!("{:.1}%", outcome.success_rate).red()
    };
    println!("Success rate: {}", status);

    if !outcome.missing.is_empty() {
        println!("\n{}", "Tracks that could not be matched:".yellow());
        for title in &outcome.missing {
            println!("  - {}", title);
        }
    }

    if !outcome.warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow());
        for warning in &outcome.warnings {
            println!("  - {}", warning);
        }
    }

    println!(
        "\n{}",
        "A full report has been saved to migration_results/".cyan()
    );
}

fn show_setup_guide() {
    println!("{}", "NetEase to Spotify Migrator Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify access token".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create an app and obtain a user access token with the");
    println!("     playlist-modify-private and ugc-image-upload scopes");

    println!("\n{}", "2. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_TOKEN=your_access_token");

    println!("\n{}", "3. Usage".yellow());
    println!("   - netify preview <playlist-url>     (inspect before transferring)");
    println!("   - netify transfer <playlist-url>    (perform the transfer)");
    println!("   - netify transfer <url> --name \"My Playlist\"");

    println!("\n{}", "Ready to start migrating!".green());
}
