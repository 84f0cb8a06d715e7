use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use tally_config::AppConfig;
use tally_fetch::RemoteClient;
use tally_roster::{Identity, Member, RemoteSource, RowStore};
use tally_runtime::{
    CycleOptions, CycleReport, LogSink, NotificationSink, UpdateProcess, spawn_update_driver,
};
use tally_store::RedbStore;

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    version,
    about = "Scoreboard roster reconciliation and announcements"
)]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run reconciliation cycles until interrupted.
    Run,
    /// Run one reconciliation cycle and print the report.
    Cycle {
        /// Also reconcile forum-post credit for every member.
        #[arg(long)]
        credits: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show one member, resolved from the store and the remote.
    Member {
        alias: String,
        /// Reconcile this member's forum-post credit on the spot.
        #[arg(long)]
        credits: bool,
    },
    /// Mark a stored member as private or public.
    Privacy {
        alias: String,
        #[arg(value_enum)]
        state: PrivacySwitch,
    },
    /// Link a stored member to an external account id.
    Link { alias: String, linked_id: String },
    /// Check the remote, the session and the store.
    Doctor {
        /// Print the findings as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PrivacySwitch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let (remote, store) = open_collaborators(&config)?;
            let process = Arc::new(UpdateProcess::new(
                remote as Arc<dyn RemoteSource>,
                store as Arc<dyn RowStore>,
                CycleOptions::from(&config.cycle),
            ));
            let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);
            let (shutdown_tx, _) = watch::channel(false);
            let driver =
                spawn_update_driver(process, sink, config.cycle_interval(), &shutdown_tx);

            tokio::signal::ctrl_c().await?;
            if shutdown_tx.send(true).is_err() {
                tracing::debug!("update driver already stopped");
            }
            driver.await?;
        }
        Commands::Cycle { credits, json } => {
            let (remote, store) = open_collaborators(&config)?;
            let mut options = CycleOptions::from(&config.cycle);
            if credits {
                options.include_credits = true;
            }
            let process = UpdateProcess::new(
                remote as Arc<dyn RemoteSource>,
                store as Arc<dyn RowStore>,
                options,
            );
            let report = process.run_cycle().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Member { alias, credits } => {
            let (remote, store) = open_collaborators(&config)?;
            let mut member = Member::by_alias(
                alias,
                remote as Arc<dyn RemoteSource>,
                store as Arc<dyn RowStore>,
            );
            let summary = member.summary().await?;
            println!("── member ───────────────────────────────────────────");
            println!("  alias        : {}", summary.display_alias());
            println!("  display name : {}", summary.display_name);
            println!(
                "  linked id    : {}",
                if summary.linked.is_empty() {
                    "(none)"
                } else {
                    summary.linked.as_str()
                }
            );
            println!("  solve count  : {}", summary.solve_count);
            println!("  level        : {}", summary.level);
            println!("  private      : {}", yes_no(summary.private));

            if credits {
                let deltas = member.reconcile_credits().await?;
                println!("  credit total : {}", member.credit_total().await?);
                if deltas.is_empty() {
                    println!("  no credit movement");
                } else {
                    for delta in &deltas {
                        println!("  post {:<8} : {:+}", delta.post, delta.delta);
                    }
                }
            }
        }
        Commands::Privacy { alias, state } => {
            let (remote, store) = open_collaborators(&config)?;
            if store
                .read_member(&Identity::Alias(alias.clone()))
                .await?
                .is_none()
            {
                bail!("{alias} is not in the store yet; run a cycle first");
            }
            let mut member = Member::by_alias(
                alias.clone(),
                remote as Arc<dyn RemoteSource>,
                store as Arc<dyn RowStore>,
            );
            let private = matches!(state, PrivacySwitch::On);
            member.push_privacy(private).await?;
            println!(
                "{alias} is now {}",
                if private { "private" } else { "public" }
            );
        }
        Commands::Link { alias, linked_id } => {
            let (remote, store) = open_collaborators(&config)?;
            if store
                .read_member(&Identity::Alias(alias.clone()))
                .await?
                .is_none()
            {
                bail!("{alias} is not in the store yet; run a cycle first");
            }
            let mut member = Member::by_alias(
                alias.clone(),
                remote as Arc<dyn RemoteSource>,
                store as Arc<dyn RowStore>,
            );
            member.push_link(&linked_id).await?;
            println!("{alias} linked to {linked_id}");
        }
        Commands::Doctor { json } => {
            let (remote, store) = open_collaborators(&config)?;
            let process = UpdateProcess::new(
                Arc::clone(&remote) as Arc<dyn RemoteSource>,
                Arc::clone(&store) as Arc<dyn RowStore>,
                CycleOptions::from(&config.cycle),
            );
            let probe = process.probe().await;
            let stats = store.stats()?;
            let metrics = remote.metrics();

            if json {
                let findings = serde_json::json!({
                    "config_file": cli.config,
                    "remote_base_url": config.remote.base_url,
                    "reachable": probe.reachable,
                    "authenticated": probe.authenticated,
                    "session_cookies": remote.has_session(),
                    "store_path": store.path().display().to_string(),
                    "members_stored": stats.members,
                    "credit_rows": stats.credit_rows,
                    "widest_solves": stats.widest_solves,
                    "fetch": metrics,
                });
                println!("{}", serde_json::to_string_pretty(&findings)?);
            } else {
                println!("tally doctor");
                println!("- config file     : {}", cli.config);
                println!("- remote base url : {}", config.remote.base_url);
                println!("- reachable       : {}", yes_no(probe.reachable));
                println!("- authenticated   : {}", yes_no(probe.authenticated));
                println!("- session cookies : {}", yes_no(remote.has_session()));
                println!("- store path      : {}", store.path().display());
                println!("- members stored  : {}", stats.members);
                println!("- credit rows     : {}", stats.credit_rows);
                println!("- widest solves   : {}", stats.widest_solves);
                println!(
                    "- requests made   : {} ({} ok)",
                    metrics.total_requests, metrics.successful_requests
                );
                match metrics.last_success_at {
                    Some(at) => println!("- last success    : {at}"),
                    None => println!("- last success    : (never)"),
                }
            }
        }
    }

    Ok(())
}

fn open_collaborators(config: &AppConfig) -> Result<(Arc<RemoteClient>, Arc<RedbStore>)> {
    let remote = Arc::new(RemoteClient::from_config(&config.remote)?);
    let store = Arc::new(RedbStore::open(
        &config.store.path,
        config.store.credit_writes,
    )?);
    Ok((remote, store))
}

fn print_report(report: &CycleReport) {
    println!("── cycle {} ──────────────────────────", report.cycle);
    println!("  members seen : {}", report.members_seen);
    println!("  changed      : {}", report.records.len());
    println!("  skipped      : {}", report.members_skipped);
    println!("  private      : {}", report.private_members);
    println!(
        "  baselines    : {}",
        if report.baselines_extended {
            "extended"
        } else {
            "unchanged"
        }
    );
    println!("  duration     : {:?}", report.duration);

    for record in &report.records {
        println!();
        println!(
            "  {} ({} solves)",
            record.member.display_alias(),
            record.member.solve_count
        );
        if !record.new_solves.is_empty() {
            println!("    solved items : {:?}", record.new_solves);
        }
        for (label, indexes) in [
            ("item awards", &record.new_awards.item),
            ("publication awards", &record.new_awards.publication),
            ("community awards", &record.new_awards.community),
        ] {
            if !indexes.is_empty() {
                // Award positions are 0-based internally, shown 1-based.
                let shown: Vec<u32> = indexes.iter().map(|index| index + 1).collect();
                println!("    {label} : {shown:?}");
            }
        }
        for delta in &record.new_credits {
            println!("    post {} credit {:+}", delta.post, delta.delta);
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
