//! Rewards CLI - Drive the rewards manager from a terminal

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rewards_core::{
    AggregateKind, ChallengeType, MilestoneId, Outcome, PayoutForm, PayoutKind, TodayChallenge,
};
use rewards_engine::{ManagerConfig, RewardsManager};
use rewards_networking::{RewardsBackend, RewardsClient};
use rewards_persistence::{sqlite::recent_payouts, Database};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage payouts, walkathon claims and spins")]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database for the payout journal and saved settings
    #[arg(long)]
    db: Option<PathBuf>,

    /// Session token
    #[arg(long, env = "REWARDS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Persist the effective config to the database
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show balance and recent transactions
    Wallet,
    /// Request a payout
    Payout {
        /// gift_card, charity, debit_card or money_transfer
        #[arg(long)]
        kind: PayoutKind,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        product: String,
        /// Defaults to the first funding source the server lists
        #[arg(long)]
        funding_source: Option<String>,
    },
    /// Settlement status of a payout order
    PayoutStatus { order_id: String },
    /// Payouts recorded in the local journal
    Payouts {
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Claim one walkathon milestone
    Claim { milestone: u64 },
    /// Claim every reached milestone
    ClaimAll,
    /// Spin the wheel and redeem the reward
    Spin,
    SpinStatus,
    /// Complete today's challenge
    CompleteChallenge {
        conversion_id: String,
        #[arg(long, value_enum, default_value = "game")]
        kind: ChallengeArg,
        /// When play started (RFC 3339)
        #[arg(long)]
        started_at: Option<DateTime<Utc>>,
    },
    /// Poll walkathon progress and leaderboard until interrupted
    Watch {
        /// Seconds between refreshes; defaults to the configured poll interval
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ChallengeArg {
    Game,
    Spin,
}

impl From<ChallengeArg> for ChallengeType {
    fn from(arg: ChallengeArg) -> Self {
        match arg {
            ChallengeArg::Game => ChallengeType::Game,
            ChallengeArg::Spin => ChallengeType::Spin,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rewards_cli=info,rewards_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let db_path = match args.db.clone() {
        Some(path) => path,
        None => dirs_next::data_local_dir()
            .map(|p| p.join("RewardsManager"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rewards.db"),
    };
    let db = Database::connect(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let config = load_config(&args, &db).await?;
    if args.save_config {
        config.save_to_db(&db).await.context("Failed to save config")?;
        info!("Config saved to {}", db_path.display());
    }

    let client = Arc::new(
        RewardsClient::with_base_url(&config.api_url, config.token.clone())
            .context("Failed to build HTTP client")?,
    );
    if !client.has_token() {
        warn!("No session token set; authenticated calls will be rejected");
    }

    let backend: Arc<dyn RewardsBackend> = client.clone();
    let manager = RewardsManager::new(backend, config).with_journal(db.clone());

    match args.command {
        Command::Wallet => {
            manager
                .refresh(&[AggregateKind::Wallet, AggregateKind::RecentTransactions])
                .await;
            let view = manager.view();
            let Some(wallet) = view.wallet() else {
                bail!("Failed to load wallet");
            };
            print_json(&*wallet)?;
            if let Some(transactions) = view.recent_transactions() {
                print_json(&*transactions)?;
            }
            let gate = manager.withdrawal_gate();
            if !manager.can_open_withdrawal() {
                println!(
                    "Withdrawals unlock at {} coins ({} more needed)",
                    gate.minimum().as_f64(),
                    gate.shortfall(wallet.balance()).as_f64()
                );
            }
        }
        Command::Payout {
            kind,
            amount,
            name,
            email,
            product,
            funding_source,
        } => {
            let funding_source_id = match funding_source {
                Some(id) => Some(id),
                None => client
                    .get_funding_sources()
                    .await
                    .context("Failed to load funding sources")?
                    .into_iter()
                    .next()
                    .map(|source| source.id),
            };

            let session = manager.open_payout(kind);
            info!("Submitting {} payout {:?}", kind.as_str(), session.external_id());
            let outcome = session
                .submit(&PayoutForm {
                    amount,
                    recipient_name: name,
                    recipient_email: email,
                    product_id: Some(product),
                    funding_source_id,
                })
                .await;
            finish(outcome)?;
        }
        Command::PayoutStatus { order_id } => finish(manager.payout_status(&order_id).await)?,
        Command::Payouts { limit } => {
            let rows = recent_payouts(db.pool(), limit)
                .await
                .context("Failed to read payout journal")?;
            print_json(&rows)?;
        }
        Command::Claim { milestone } => finish(manager.claim(MilestoneId(milestone)).await)?,
        Command::ClaimAll => {
            let results = manager.claim_all_available().await;
            if results.is_empty() {
                println!("No milestones to claim");
            }
            for (milestone, outcome) in results {
                match outcome.error() {
                    None => println!("{}: claimed", milestone),
                    Some(failure) => println!("{}: {}", milestone, failure.user_message),
                }
            }
        }
        Command::Spin => finish(manager.spin_and_redeem().await)?,
        Command::SpinStatus => finish(manager.spin_status().await)?,
        Command::CompleteChallenge {
            conversion_id,
            kind,
            started_at,
        } => {
            let challenge = TodayChallenge {
                conversion_id,
                challenge_type: kind.into(),
                started_at,
            };
            finish(manager.complete_challenge(&challenge).await)?;
        }
        Command::Watch { interval } => {
            let handle = match interval {
                Some(secs) => manager.start_auto_refresh(
                    vec![AggregateKind::Progress, AggregateKind::Leaderboard],
                    Duration::from_secs(secs.max(1)),
                ),
                None => manager.start_walkathon_refresh(),
            };
            info!("Watching walkathon progress, press Ctrl+C to stop");

            let mut ticker = tokio::time::interval(Duration::from_secs(5));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        if let Some(progress) = manager.view().progress() {
                            let ledger = manager.ledger();
                            println!(
                                "{} steps, {} milestones claimable",
                                progress.total_steps,
                                ledger.available().len()
                            );
                        }
                    }
                }
            }

            handle.shutdown().await;
        }
    }

    manager.shutdown();
    Ok(())
}

/// File config (or the one saved in the database), then env, then flags
async fn load_config(args: &Args, db: &Database) -> Result<ManagerConfig> {
    let mut config = match &args.config {
        Some(path) => ManagerConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ManagerConfig::load_from_db(db).await?.unwrap_or_default(),
    };
    config.apply_env();
    if let Some(token) = &args.token {
        config.token = Some(token.clone());
    }
    config.validate()?;
    Ok(config)
}

fn finish<T: Serialize>(outcome: Outcome<T>) -> Result<()> {
    print_json(&outcome)?;
    match outcome.error() {
        Some(failure) => bail!("{}", failure.user_message),
        None => Ok(()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
