//! # GuardPost — Proxy-Isolated Comment Moderation
//!
//! Polls posts across many platform accounts, each routed through its
//! own dedicated proxy, and tracks / deletes / hides new comments.
//!
//! Usage:
//!   guardpost                              # Run with ~/.guardpost/config.toml
//!   guardpost --config ./guardpost.toml    # Explicit config file
//!   guardpost --add-proxy 1.2.3.4:1080     # Add a proxy and exit
//!   guardpost --check-proxies              # Health-sweep the pool and exit
//!   guardpost --register-account <BUNDLE>  # Register an account and exit

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use guardpost_core::types::ActionMode;
use guardpost_core::GuardPostConfig;
use guardpost_platform::register_account;
use guardpost_proxy::{HttpEchoProbe, ProxyChoice, ProxyPool};
use guardpost_scheduler::{Dispatcher, PlatformClientFactory, ScheduleService};
use guardpost_store::Store;

#[derive(Parser)]
#[command(
    name = "guardpost",
    version,
    about = "🛡️ GuardPost — proxy-isolated comment moderation"
)]
struct Cli {
    /// Config file path (default: ~/.guardpost/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Database path (overrides the config file)
    #[arg(long)]
    db_path: Option<String>,

    /// Add a proxy (host:port or host:port:user:pass) and exit
    #[arg(long, value_name = "PROXY")]
    add_proxy: Option<String>,

    /// Skip the health check when adding a proxy
    #[arg(long)]
    no_check: bool,

    /// Health-check every proxy in the pool and exit
    #[arg(long)]
    check_proxies: bool,

    /// Register an account from a base64 credential bundle and exit
    #[arg(long, value_name = "BUNDLE")]
    register_account: Option<String>,

    /// Owner user id (used with --register-account / --add-task)
    #[arg(long, default_value = "1")]
    user_id: i64,

    /// Bind this specific proxy (used with --register-account)
    #[arg(long)]
    proxy_id: Option<i64>,

    /// Create a moderation task for a post id and exit
    #[arg(long, value_name = "POST_ID")]
    add_task: Option<String>,

    /// Account id owning the task (used with --add-task)
    #[arg(long)]
    account_id: Option<i64>,

    /// Action mode: TRACK, DELETE, or HIDE (used with --add-task)
    #[arg(long, default_value = "TRACK")]
    action: String,

    /// Enable Telegram notification for the task (used with --add-task)
    #[arg(long)]
    notify: bool,

    /// Deactivate a task and exit
    #[arg(long, value_name = "TASK_ID")]
    deactivate_task: Option<i64>,

    /// Skip the startup proxy health sweep
    #[arg(long)]
    skip_proxy_sweep: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

/// "host:port" or "host:port:user:pass".
fn parse_proxy_arg(raw: &str) -> Result<(String, u16, Option<String>, Option<String>)> {
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.as_slice() {
        [host, port] => Ok(((*host).into(), port.parse()?, None, None)),
        [host, port, user, pass] => Ok((
            (*host).into(),
            port.parse()?,
            Some((*user).into()),
            Some((*pass).into()),
        )),
        _ => bail!("expected host:port or host:port:user:pass, got '{raw}'"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "guardpost=debug" } else { "guardpost=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => GuardPostConfig::load_from(Path::new(&expand_path(path)))?,
        None => GuardPostConfig::load()?,
    };

    let db_path = expand_path(cli.db_path.as_deref().unwrap_or(&config.database.path));
    let store = Arc::new(Store::open(Path::new(&db_path))?);

    let probe = Arc::new(HttpEchoProbe::new(config.proxy.echo_url.as_str()));
    let pool = ProxyPool::new(store.clone(), probe, config.proxy.clone());

    // --add-proxy: insert (optionally health-checked) and exit
    if let Some(raw) = &cli.add_proxy {
        let (host, port, username, password) = parse_proxy_arg(raw)?;
        let (proxy, checked) = pool
            .add_proxy(&host, port, username.as_deref(), password.as_deref(), !cli.no_check)
            .await?;
        match checked {
            Some(result) if result.success => {
                println!("✅ Proxy {} added: {}:{} is ACTIVE", proxy.id, host, port)
            }
            Some(_) => println!("⚠️  Proxy {} added: {}:{} is DEAD", proxy.id, host, port),
            None => println!("✅ Proxy {} added: {}:{} (unchecked)", proxy.id, host, port),
        }
        return Ok(());
    }

    // --check-proxies: sweep the whole pool and exit
    if cli.check_proxies {
        let summary = pool.check_all().await?;
        println!("🔌 Checked {} proxies: {} alive, {} dead", summary.total, summary.alive, summary.dead);
        for result in &summary.results {
            match &result.egress_ip {
                Some(ip) => println!(
                    "   ✅ proxy {} → {} ({}ms)",
                    result.proxy_id,
                    ip,
                    result.latency_ms.unwrap_or_default()
                ),
                None => println!(
                    "   ❌ proxy {} → {}",
                    result.proxy_id,
                    result.error.as_deref().unwrap_or("unreachable")
                ),
            }
        }
        return Ok(());
    }

    // --register-account: resolve proxy, fetch identity, upsert, exit
    if let Some(bundle) = &cli.register_account {
        let choice = match cli.proxy_id {
            Some(id) => ProxyChoice::Explicit(id),
            None => ProxyChoice::Auto,
        };
        let account =
            register_account(&store, &config.platform, cli.user_id, bundle, choice).await?;
        println!("✅ Account {} registered: {} ({})", account.id, account.name, account.platform_user_id);
        return Ok(());
    }

    // --add-task: create the (account, post) task and exit
    if let Some(post_id) = &cli.add_task {
        let Some(account_id) = cli.account_id else {
            bail!("--add-task requires --account-id");
        };
        let task = store.create_task(account_id, post_id, ActionMode::parse(&cli.action), cli.notify)?;
        println!("✅ Task {} created: {} on post {} (restart the daemon or wait for bootstrap)",
            task.id, task.action.as_str(), task.post_id);
        return Ok(());
    }

    // --deactivate-task: stop scheduling, keep history, exit
    if let Some(task_id) = cli.deactivate_task {
        store.set_task_active(task_id, false)?;
        println!("✅ Task {task_id} deactivated");
        return Ok(());
    }

    println!("🛡️ GuardPost v{}", env!("CARGO_PKG_VERSION"));
    println!("   🗄️  Database:      {db_path}");
    println!("   🌐 Platform API:   {}", config.platform.api_base);
    println!(
        "   🕒 Poll interval:  {}ms, {} jobs wide",
        config.scheduler.poll_interval_ms, config.scheduler.job_concurrency
    );
    println!(
        "   📨 Notifications:  {}",
        if config.telegram.is_some() { "telegram" } else { "disabled" }
    );
    println!();

    // Health-sweep the pool before jobs start routing through it.
    if !cli.skip_proxy_sweep {
        let summary = pool.check_all().await?;
        if summary.total > 0 {
            println!(
                "🔌 Proxy sweep: {}/{} alive, {} dead",
                summary.alive, summary.total, summary.dead
            );
        }
        if summary.dead > 0 {
            tracing::warn!("⚠️  {} dead proxies — accounts bound to them will fail their polls", summary.dead);
        }
    }

    let notifier = guardpost_channels::notifier_from_config(config.telegram.as_ref());
    let clients = Arc::new(PlatformClientFactory::new(config.platform.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        notifier,
        clients,
        config.scheduler.job_concurrency,
    ));
    let scheduler = ScheduleService::open(
        store,
        dispatcher,
        Duration::from_millis(config.scheduler.poll_interval_ms),
    );

    let scheduled = scheduler.bootstrap()?;
    println!("✅ Running with {scheduled} active task(s). Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    println!("\n👋 Shutting down...");
    scheduler.close();

    Ok(())
}
