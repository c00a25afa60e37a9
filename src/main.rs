// Thin CLI front end standing in for the dashboard UI: loads a profile
// through the engine and prints aggregate results
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use playhist::aggregate::Dimension;
use playhist::{AppConfig, Engine, FilterSelection};

#[derive(Parser, Debug)]
#[command(name = "playhist", about = "Explore personal streaming-history exports")]
struct Cli {
    /// Directory holding the config file (defaults to the working directory)
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the profiles available under the profiles directory
    Profiles,
    /// Top entities of a dimension by minutes played
    Top {
        profile: String,
        #[arg(value_enum)]
        dimension: Dimension,
        #[arg(short, long)]
        n: Option<usize>,
        /// Restrict to these years
        #[arg(long)]
        year: Vec<i32>,
        /// Restrict to these artists
        #[arg(long)]
        artist: Vec<String>,
    },
    /// Listening minutes over time
    Trend { profile: String },
    /// Per-artist loyalty ranking
    Loyalty {
        profile: String,
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// Ingestion report and dataset overview for a profile
    Summary { profile: String },
}

fn selection(years: Vec<i32>, artists: Vec<String>) -> FilterSelection {
    FilterSelection {
        years,
        artists,
        ..Default::default()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config_dir)?;
    let default_top_n = config.aggregate.default_top_n;
    let mut engine = Engine::new(config)?;

    match cli.command {
        Command::Profiles => {
            let profiles = engine.list_profiles();
            if profiles.is_empty() {
                println!("No profiles found. Create a directory per profile with export JSON files.");
            }
            for profile in profiles {
                println!("{profile}");
            }
        }
        Command::Top {
            profile,
            dimension,
            n,
            year,
            artist,
        } => {
            let loaded = engine.load_profile(&profile)?;
            let n = n.unwrap_or(default_top_n);
            let filter = selection(year, artist);
            match engine.top(&profile, &loaded.data.canonical, dimension, n, &filter) {
                Some(entries) => {
                    for (rank, entry) in entries.iter().enumerate() {
                        println!(
                            "{:>3}. {:<50} {:>10.1} min {:>7} plays",
                            rank + 1,
                            entry.name,
                            entry.minutes,
                            entry.plays
                        );
                    }
                }
                None => println!("No data for this selection."),
            }
        }
        Command::Trend { profile } => {
            let loaded = engine.load_profile(&profile)?;
            match engine.trend(&profile, &loaded.data.canonical, &FilterSelection::default()) {
                Some(series) => {
                    for point in series.points {
                        println!("{:<10} {:>10.1} min", point.label, point.minutes);
                    }
                }
                None => println!("No data."),
            }
        }
        Command::Loyalty { profile, n } => {
            let loaded = engine.load_profile(&profile)?;
            let n = n.unwrap_or(default_top_n);
            match engine.loyalty(
                &profile,
                &loaded.data.canonical,
                n,
                &FilterSelection::default(),
            ) {
                Some(entries) if !entries.is_empty() => {
                    for entry in entries {
                        println!(
                            "{:<40} score {:>6.1}  ({} days over {} day span)",
                            entry.artist, entry.score, entry.unique_days, entry.span_days
                        );
                    }
                }
                _ => println!("No artists above the loyalty minutes floor."),
            }
        }
        Command::Summary { profile } => {
            let loaded = engine.load_profile(&profile)?;
            let data = &loaded.data;
            println!(
                "{}: {} events, {:.1} minutes total{}",
                loaded.profile,
                data.canonical.len(),
                data.canonical.total_minutes(),
                if loaded.from_cache { " (cached)" } else { "" }
            );
            if let Some(report) = &loaded.report {
                println!(
                    "ingested {} of {} files ({} skipped, {} unrecognized), {} records kept, {} skipped, {} sampled out",
                    report.files_parsed,
                    report.files_scanned,
                    report.skipped_files.len(),
                    report.unrecognized_files.len(),
                    report.records_kept,
                    report.records_skipped,
                    report.records_sampled_out
                );
                for skipped in &report.skipped_files {
                    println!("  skipped {}: {}", skipped.filename, skipped.reason);
                }
            }
            if let Some(account) = &data.account {
                println!(
                    "account: {}",
                    account.username.as_deref().unwrap_or("(unnamed)")
                );
            }
            if let Some(library) = &data.library {
                println!(
                    "library: {} tracks, {} albums, {} artists",
                    library.track_count, library.album_count, library.artist_count
                );
            }
            if let Some(playlists) = &data.playlists {
                println!("playlists: {}", playlists.playlists.len());
                for row in &playlists.playlists {
                    println!(
                        "  {} ({} tracks, ~{:.0} min)",
                        row.name, row.track_count, row.estimated_minutes
                    );
                }
            }
            if let Some(searches) = &data.searches {
                println!(
                    "searches: {} sampled of {}",
                    searches.queries.len(),
                    searches.total_queries
                );
            }
            for wrapped in &data.wrapped {
                println!(
                    "wrapped {}: {} highlights",
                    wrapped
                        .year
                        .map(|y| y.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                    wrapped.highlights.len()
                );
            }
        }
    }

    Ok(())
}
