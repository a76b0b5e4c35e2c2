//! finance-ai-scout — Binary Entrypoint
//! One-shot CLI: trigger a digest run now, or inspect the configuration.
//! Scheduling is external (cron / GitHub Actions); the binary never loops.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use finance_ai_scout::assemble::ReportAssembler;
use finance_ai_scout::config::ScoutConfig;
use finance_ai_scout::deliver::{
    message::LineMessenger, publish::GitSync, store::ReportStore, Dispatcher,
};
use finance_ai_scout::enrich::{DiscussionSource, SentimentEnricher};
use finance_ai_scout::llm::{GeminiBackend, RankingBackend};
use finance_ai_scout::pipeline::{Pipeline, RunOutcome};
use finance_ai_scout::select::{
    delegated::DelegatedSelector, heuristic::HeuristicSelector, Selector,
};
use finance_ai_scout::source::{
    default_profiles, rss::RssAdapter, tavily::TavilyClient, tavily::TavilySourceAdapter,
    CategoryProfile, FetchConstraints, SourceAdapter,
};
use finance_ai_scout::types::ChannelKind;

const EXIT_OK: i32 = 0;
const EXIT_RUN_FAILED: i32 = 1;
const EXIT_NO_CANDIDATES: i32 = 2;

#[derive(Parser)]
#[command(name = "finance-ai-scout", version, about = "Daily finance & AI news digest")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one digest run now.
    Run {
        /// Selection strategy; defaults to delegated when GEMINI_API_KEY is
        /// set, heuristic otherwise.
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
        /// Fixed seed for the heuristic jitter (overrides SCOUT_JITTER_SEED).
        #[arg(long)]
        seed: Option<u64>,
        /// Delivery channels, comma-separated.
        #[arg(long, value_enum, value_delimiter = ',')]
        channels: Option<Vec<ChannelArg>>,
        /// Optional RSS feed used as an extra "headlines" category.
        #[arg(long)]
        rss_feed: Option<String>,
        /// Top-N kept per category.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print which external credentials are configured.
    CheckConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Heuristic,
    Delegated,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Message,
    File,
    Publish,
}

impl From<ChannelArg> for ChannelKind {
    fn from(value: ChannelArg) -> Self {
        match value {
            ChannelArg::Message => ChannelKind::PushMessage,
            ChannelArg::File => ChannelKind::PersistFile,
            ChannelArg::Publish => ChannelKind::PersistAndPublish,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("finance_ai_scout=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op in CI where secrets come from the runner.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = ScoutConfig::from_env();

    let code = match cli.command {
        Command::CheckConfig => check_config(&cfg),
        Command::Run {
            strategy,
            seed,
            channels,
            rss_feed,
            limit,
        } => run(cfg, strategy, seed, channels, rss_feed, limit).await,
    };
    std::process::exit(code);
}

fn check_config(cfg: &ScoutConfig) -> i32 {
    let flag = |b: bool| if b { "set" } else { "missing" };
    println!("TAVILY_API_KEY:            {}", flag(cfg.tavily_api_key.is_some()));
    println!("GEMINI_API_KEY:            {}", flag(cfg.gemini_api_key.is_some()));
    println!("LINE_CHANNEL_ACCESS_TOKEN: {}", flag(cfg.line_access_token.is_some()));
    println!(
        "LINE_USER_ID:              {}",
        if cfg.line_recipient.is_some() { "set (addressed push)" } else { "missing (broadcast)" }
    );
    println!(
        "GITHUB credentials:        {}",
        if cfg.remote.is_some() { "set (push enabled)" } else { "missing (local-only)" }
    );
    println!("report dir:                {}", cfg.report_dir.display());
    EXIT_OK
}

async fn run(
    cfg: ScoutConfig,
    strategy: Option<Strategy>,
    seed: Option<u64>,
    channels: Option<Vec<ChannelArg>>,
    rss_feed: Option<String>,
    limit: usize,
) -> i32 {
    let tavily = cfg.tavily_api_key.clone().map(TavilyClient::new);
    let gemini: Option<Arc<dyn RankingBackend>> = cfg
        .gemini_api_key
        .clone()
        .map(|k| Arc::new(GeminiBackend::new(k)) as Arc<dyn RankingBackend>);

    // --- sources ---
    let mut sources: Vec<(CategoryProfile, Arc<dyn SourceAdapter>)> = Vec::new();
    if let Some(client) = &tavily {
        let adapter: Arc<dyn SourceAdapter> = Arc::new(TavilySourceAdapter::new(client.clone()));
        for profile in default_profiles() {
            sources.push((profile, adapter.clone()));
        }
    } else {
        tracing::warn!("TAVILY_API_KEY missing; search-based categories disabled");
    }
    if let Some(url) = rss_feed {
        sources.push((
            CategoryProfile {
                name: "headlines".to_string(),
                query: String::new(),
                constraints: FetchConstraints {
                    days: 1,
                    include_domains: vec![],
                    max_results: 15,
                },
            },
            Arc::new(RssAdapter::from_url(url)),
        ));
    }

    // --- strategy: selector + report shape are one per-run choice ---
    let strategy = strategy.unwrap_or(if gemini.is_some() {
        Strategy::Delegated
    } else {
        Strategy::Heuristic
    });
    let (selector, assembler): (Arc<dyn Selector>, ReportAssembler) = match strategy {
        Strategy::Delegated => match &gemini {
            Some(backend) => (
                Arc::new(DelegatedSelector::new(backend.clone())),
                ReportAssembler::sectioned(),
            ),
            None => {
                tracing::warn!("delegated strategy needs GEMINI_API_KEY; using heuristic");
                (heuristic_selector(seed.or(cfg.jitter_seed)), ReportAssembler::merged())
            }
        },
        Strategy::Heuristic => (
            heuristic_selector(seed.or(cfg.jitter_seed)),
            ReportAssembler::merged(),
        ),
    };

    // --- enricher ---
    let discussions = tavily
        .clone()
        .map(|c| Arc::new(c) as Arc<dyn DiscussionSource>);
    let enricher = Arc::new(SentimentEnricher::new(discussions, gemini.clone()));

    // --- delivery ---
    let channels: Vec<ChannelKind> = channels
        .map(|v| v.into_iter().map(ChannelKind::from).collect())
        .unwrap_or_else(|| vec![ChannelKind::PushMessage, ChannelKind::PersistAndPublish]);
    let mut dispatcher = Dispatcher::new(ReportStore::new(cfg.report_dir.clone()));
    if let Some(token) = cfg.line_access_token.clone() {
        dispatcher = dispatcher.with_messenger(Arc::new(LineMessenger::new(
            token,
            cfg.line_recipient.clone(),
        )));
    }
    if channels.contains(&ChannelKind::PersistAndPublish) {
        dispatcher = dispatcher.with_sync(Arc::new(GitSync::new(".", cfg.remote.clone())));
    }
    if let Some(base) = cfg.public_base_url.clone() {
        dispatcher = dispatcher.with_public_base_url(base);
    }

    let pipeline = Pipeline::new(sources, selector, enricher, assembler, dispatcher, channels)
        .with_limit(limit);

    // Ctrl-C raises the abort flag; the run stops at the next stage boundary.
    let abort = pipeline.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; aborting between stages");
            abort.store(true, Ordering::SeqCst);
        }
    });

    match pipeline.run().await {
        Ok(RunOutcome::Completed(summary)) => {
            tracing::info!(
                fetched = summary.fetched,
                selected = summary.selected,
                report_items = summary.report_items,
                "run completed"
            );
            for r in &summary.receipts {
                tracing::info!(channel = %r.channel, status = ?r.status, "receipt");
            }
            EXIT_OK
        }
        Ok(RunOutcome::NoCandidates) => {
            tracing::error!("no news fetched; nothing to report");
            EXIT_NO_CANDIDATES
        }
        Ok(RunOutcome::Aborted) => {
            tracing::warn!("run aborted by signal");
            EXIT_OK
        }
        Err(e) => {
            tracing::error!(error = ?e, "run failed");
            EXIT_RUN_FAILED
        }
    }
}

fn heuristic_selector(seed: Option<u64>) -> Arc<dyn Selector> {
    Arc::new(match seed {
        Some(s) => HeuristicSelector::with_seed(s),
        None => HeuristicSelector::new(),
    })
}
