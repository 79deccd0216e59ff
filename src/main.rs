//! # PingPal CLI
//!
//! Engagement throttle & delivery coordinator for companion chat
//! services.
//!
//! Usage:
//!   pingpal run                        # Start jobs + gateway
//!   pingpal touch -u alice             # Record user activity
//!   pingpal state -u alice             # Inspect a user's gates
//!   pingpal enable -u alice --off      # Opt a user out of pushes
//!   pingpal config show                # Show configuration

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pingpal_channels::{ConsoleDelivery, FileSource, TemplateGenerator, WebhookDelivery};
use pingpal_core::PingPalConfig;
use pingpal_core::traits::{ContentSource, Delivery};
use pingpal_jobs::{ArticlesJob, DigestJob, JobCtx, MarketJob, NudgeJob, QuietHours, WeatherJob};
use pingpal_scheduler::Engine;
use pingpal_store::EngagementStore;

#[derive(Parser)]
#[command(
    name = "pingpal",
    version,
    about = "Engagement throttle & delivery coordinator",
    long_about = "Decides when a companion chat service may send unsolicited messages:\nidle scanning, atomic slot claiming, daily quotas, cooldowns, and dedup\nover one shared SQLite store."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the job engine and the activity gateway
    Run,

    /// Record user activity (what the chat service does on every turn)
    Touch {
        /// User to touch
        #[arg(short, long)]
        user: String,
    },

    /// Toggle a user's push opt-out switch
    Enable {
        /// User to toggle
        #[arg(short, long)]
        user: String,

        /// Opt the user out instead of in
        #[arg(long)]
        off: bool,
    },

    /// Show a user's activity row and gate state
    State {
        /// User to inspect
        #[arg(short, long)]
        user: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Reset to defaults
    Reset,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "pingpal=debug,pingpal_store=debug,pingpal_jobs=debug,pingpal_scheduler=debug"
    } else {
        "pingpal=info,pingpal_jobs=info,pingpal_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        PingPalConfig::load_from(std::path::Path::new(path))?
    } else {
        PingPalConfig::load()?
    };

    match cli.command {
        Commands::Run => run(config).await?,

        Commands::Touch { user } => {
            let store = EngagementStore::open(&config.store.resolved_path())?;
            store.touch(&user, chrono::Utc::now())?;
            println!("✅ touched {user}");
        }

        Commands::Enable { user, off } => {
            let store = EngagementStore::open(&config.store.resolved_path())?;
            store.set_enabled(&user, !off)?;
            println!("✅ {user}: pushes {}", if off { "disabled" } else { "enabled" });
        }

        Commands::State { user } => {
            let store = EngagementStore::open(&config.store.resolved_path())?;
            match store.activity(&user)? {
                Some(row) => {
                    println!("user:        {}", row.user_id);
                    println!("last active: {}", row.last_active_at);
                    println!("enabled:     {}", row.enabled);
                    for gate in ["shared", "nudge", "articles", "weather", "digest", "market"] {
                        if let Some(g) = store.gate_state(&user, gate)? {
                            println!(
                                "gate {gate}: sent {} on {:?}, cooldown_until {}, lock_until {}",
                                g.sent_count_today, g.sent_date, g.cooldown_until_ts, g.lock_until_ts
                            );
                        }
                    }
                }
                None => println!("(no such user)"),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&config)?;
                println!("{content}");
            }
            ConfigAction::Reset => {
                PingPalConfig::default().save()?;
                println!("✅ Configuration reset to defaults.");
            }
            ConfigAction::Path => {
                println!("{}", PingPalConfig::default_path().display());
            }
        },
    }

    Ok(())
}

async fn run(config: PingPalConfig) -> Result<()> {
    println!("PingPal v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(EngagementStore::open(&config.store.resolved_path())?);

    let delivery: Arc<dyn Delivery> = match config.delivery.kind.as_str() {
        "webhook" => {
            let url = config
                .delivery
                .webhook_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("delivery.kind = \"webhook\" needs webhook_url"))?;
            Arc::new(WebhookDelivery::new(url))
        }
        "console" => Arc::new(ConsoleDelivery),
        other => anyhow::bail!("unknown delivery kind: {other}"),
    };

    let generator = Arc::new(TemplateGenerator);
    let quiet = QuietHours::from_config(&config.quiet_hours)?;
    let ctx = JobCtx::new(store.clone(), generator, delivery, &config.engagement, quiet);

    let pool_path = shellexpand::tilde(&config.jobs.articles.pool_path).into_owned();
    let source: Arc<dyn ContentSource> = Arc::new(FileSource::new(pool_path));

    let mut engine = Engine::new();
    if config.jobs.nudge.enabled {
        engine.register(Arc::new(NudgeJob::new(ctx.clone(), config.jobs.nudge.clone())));
    }
    if config.jobs.articles.enabled {
        engine.register(Arc::new(ArticlesJob::new(
            ctx.clone(),
            source.clone(),
            config.jobs.articles.clone(),
        )));
    }
    if config.jobs.weather.enabled {
        engine.register(Arc::new(WeatherJob::new(ctx.clone(), config.jobs.weather.clone())));
    }
    if config.jobs.digest.enabled {
        engine.register(Arc::new(DigestJob::new(
            ctx.clone(),
            source.clone(),
            config.jobs.digest.clone(),
        )?));
    }
    if config.jobs.market.enabled {
        engine.register(Arc::new(MarketJob::new(ctx.clone(), config.jobs.market.clone())));
    }
    if engine.is_empty() {
        tracing::warn!("no jobs enabled; only the gateway will run");
    }

    if config.gateway.enabled {
        let gateway_config = config.gateway.clone();
        let gateway_store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = pingpal_gateway::serve(&gateway_config, gateway_store).await {
                tracing::error!("gateway stopped: {e}");
            }
        });
    }

    println!("Running. Press Ctrl+C to stop.");
    tokio::select! {
        result = engine.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            println!("\n👋 Stopped.");
        }
    }
    Ok(())
}
