use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parlay_pulse::confidence::ConfidenceScorer;
use parlay_pulse::config::Config;
use parlay_pulse::ocr::{TesseractOcr, TextRecognizer};
use parlay_pulse::odds::{american_odds_to_probability, combined_decimal_odds};
use parlay_pulse::slip_parser::{self, PairingFlag, ParsedSlip};
use parlay_pulse::store::{save_records_to_csv, AnalysisStore, JsonFileStore, HISTORY_LIMIT};
use parlay_pulse::{Bet, BetAnalysis};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parlay-pulse", about = "Parlay Pulse confidence tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse saved OCR text of a betting slip
    Parse { file: PathBuf },
    /// Run OCR on a slip screenshot and parse it
    Slip { image: PathBuf },
    /// Score a single moneyline bet against live NFL stats
    Analyze {
        #[arg(long)]
        team: String,
        #[arg(long)]
        opponent: String,
        #[arg(long, default_value_t = -110, allow_hyphen_values = true)]
        odds: i32,
    },
    /// Show stored analyses for a wallet
    History {
        wallet: String,
        /// Also export the records to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn print_slip(slip: &ParsedSlip) {
    let parlay = &slip.parlay;
    match parlay.total_odds {
        Some(odds) => println!(
            "Total odds: {:+} (implied {:.1}%)",
            odds,
            american_odds_to_probability(odds) * 100.0
        ),
        None => println!("Total odds: not found"),
    }

    if parlay.individual_bets.is_empty() {
        println!("No legs recognized.");
    } else {
        println!("{} legs:\n", parlay.individual_bets.len());
        for (i, bet) in parlay.individual_bets.iter().enumerate() {
            println!(
                "{}. {} vs {} ({:+}) | Implied: {:.1}%",
                i + 1,
                bet.team,
                bet.opponent,
                bet.odds,
                american_odds_to_probability(bet.odds) * 100.0
            );
        }
        let leg_odds: Vec<i32> = parlay.individual_bets.iter().map(|b| b.odds).collect();
        println!(
            "\nCombined leg payout: {:.2}x",
            combined_decimal_odds(&leg_odds)
        );
    }

    for flag in &slip.flags {
        match flag {
            PairingFlag::UnmatchedPick {
                leg,
                picked,
                away,
                home,
            } => println!(
                "⚠️  Leg {}: pick '{}' matches neither side of {} @ {}",
                leg + 1,
                picked,
                away,
                home
            ),
            PairingFlag::MissingPick { leg, away, home } => println!(
                "⚠️  Leg {}: no pick found for {} @ {}, skipped",
                leg + 1,
                away,
                home
            ),
        }
    }
}

fn load_config() -> Result<Config> {
    Config::from_env().context("Invalid configuration")
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Parse { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            print_slip(&slip_parser::parse_detailed(&text));
        }
        Command::Slip { image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let config = load_config()?;
            let ocr = TesseractOcr::new().with_binary(&config.tesseract_bin);
            let text = ocr
                .recognize(&bytes)
                .await
                .context("Failed to extract text from slip image")?;
            print_slip(&slip_parser::parse_detailed(&text));
        }
        Command::Analyze {
            team,
            opponent,
            odds,
        } => {
            let config = load_config()?;
            let stats = config
                .stats_client()
                .context("NFL_API_KEY not set in .env file")?;
            let scorer =
                ConfidenceScorer::new(Arc::new(stats)).with_policy(config.scoring.clone());
            let bet = Bet::moneyline(team, opponent, odds);

            let analysis = match scorer.try_analyze(&bet).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    eprintln!("Warning: {}", e);
                    BetAnalysis::fallback()
                }
            };

            println!(
                "{} vs {} ({:+}) | Confidence: {}% | {}",
                bet.team, bet.opponent, bet.odds, analysis.confidence_score, analysis.recommendation
            );
            for factor in &analysis.factors {
                println!("  - {}", factor);
            }
        }
        Command::History { wallet, csv } => {
            let config = load_config()?;
            let store = JsonFileStore::new(&config.store_path);
            let records = store
                .find_by_wallet(&wallet, HISTORY_LIMIT)
                .await
                .context("Failed to read analysis history")?;

            if records.is_empty() {
                println!("No analyses found for {}.", wallet);
            } else {
                println!("{} most recent analyses for {}:\n", records.len(), wallet);
                for (i, record) in records.iter().enumerate() {
                    println!(
                        "{}. {} | {} legs | Score: {}%{}",
                        i + 1,
                        record.timestamp.format("%Y-%m-%d %H:%M"),
                        record.bets.len(),
                        record.overall_score,
                        if record.should_show_alternative {
                            " | alternative suggested"
                        } else {
                            ""
                        }
                    );
                }
            }

            if let Some(path) = csv {
                save_records_to_csv(&records, &path)?;
                println!("\nSaved history to {}", path.display());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    run(Cli::parse()).await
}
