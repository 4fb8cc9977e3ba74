#![deny(warnings)]

//! Headless CLI that plays a scripted session against an in-memory store and
//! reports the resulting economy.

use anyhow::{Context, Result};
use chrono::Duration;
use idle_core::{AssetType, Clock, GameConfig, ManualClock, PlayerId, SystemClock};
use idle_runtime::GameService;
use persistence::InMemoryRepository;
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    steps: Option<u64>,
    seed: Option<u64>,
    clicks: Option<u32>,
    snapshot: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next(),
            "--steps" => args.steps = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--clicks" => args.clicks = it.next().and_then(|s| s.parse().ok()),
            "--snapshot" => args.snapshot = it.next(),
            _ => {}
        }
    }
    args
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut cfg = match &args.config {
        Some(path) => GameConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {path}"))?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.network.seed = seed;
    }
    Ok(cfg)
}

/// Cheapest asset the player can afford right now, if any.
fn cheapest_affordable(view: &idle_econ::PlayerView) -> Option<(AssetType, Decimal)> {
    view.assets
        .iter()
        .filter(|o| o.affordable)
        .filter_map(|o| o.next_cost.map(|c| (o.asset, c)))
        .min_by_key(|&(_, c)| c)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(
        git = env!("GIT_SHA"),
        built = env!("BUILD_DATE"),
        ?args,
        "starting CLI"
    );

    let cfg = load_config(&args)?;
    let steps = args.steps.unwrap_or(144);
    let clicks = args.clicks.unwrap_or(500);

    // replay on a manual clock anchored at wall time
    let start = SystemClock.now();
    let svc = GameService::new(cfg, InMemoryRepository::new(), ManualClock::new(start))?;
    let id = PlayerId("demo".to_string());
    svc.init(&id)?;

    let mut purchases = 0u32;
    let mut unlocked = 0usize;
    for _ in 0..clicks {
        let out = svc.click(&id)?;
        unlocked += out.unlocked.len();
    }

    let spacing = Duration::seconds(svc.config().network.target_step_secs as i64);
    for _ in 0..steps {
        svc.clock().advance(spacing);
        svc.step_network()?;
        let mut out = svc.sync(&id)?;
        unlocked += out.unlocked.len();
        while let Some((asset, _)) = cheapest_affordable(&out.view) {
            let bought = svc.purchase_asset(&id, asset)?;
            unlocked += bought.unlocked.len();
            purchases += 1;
            out = svc.sync(&id)?;
        }
        if out.view.prestige.eligible && out.view.prestige.points_on_reset > 0 {
            let reset = svc.prestige(&id)?;
            info!(points = reset.result, "prestiged");
        }
    }

    let last = svc.sync(&id)?;
    let network = svc.network();
    let view = &last.view;
    println!(
        "Network | height: {} | difficulty: {:.3} | observed: {:.1} | pool: {} | price: {:.4}",
        network.work_height,
        network.difficulty,
        network.observed_capacity,
        network.pending_work_pool,
        network.market_price
    );
    println!(
        "KPI | coins: {} | lifetime: {} | income/s: {:.4} | click: {:.6} | rank: {} | purchases: {} | achievements: {} (+{}) | prestige pts: {}",
        view.coins.round_dp(2),
        view.lifetime_earnings.round_dp(2),
        view.income_per_second,
        view.click_power,
        view.rank,
        purchases,
        view.achievements,
        unlocked,
        view.prestige_points
    );
    println!("{}", serde_json::to_string_pretty(view)?);

    if let Some(path) = &args.snapshot {
        svc.repository()
            .snapshot(svc.clock().now())
            .save_to(path)
            .with_context(|| format!("writing snapshot to {path}"))?;
        println!("Snapshot written to {path}");
    }
    Ok(())
}
