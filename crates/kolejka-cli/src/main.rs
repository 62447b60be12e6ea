//! `kolejka` binary — a thin CLI front over the cache-backed client.
//!
//! Reads `config.toml` (or the path given with `--config`) plus
//! `KOLEJKA_`-prefixed environment variables, opens the SQLite cache,
//! and runs one of the subcommands. `watch` refreshes on a timer, which
//! is all the presentation this repo ships; charts belong elsewhere.

mod config;

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kolejka_cache::CachedClient;
use kolejka_client::WsStoreClient;
use kolejka_core::{source::QueueSource, store::QueueStore};
use kolejka_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[derive(Parser)]
#[command(author, version, about = "Warsaw queue-status viewer")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List known offices.
  Offices,

  /// List an office's administrative matters.
  Matters {
    #[arg(long)]
    office: Option<String>,
  },

  /// Show cached samples for one matter.
  Samples {
    #[arg(long)]
    office: Option<String>,
    /// Matter ordinal; omit for matters without one.
    #[arg(long)]
    ordinal: Option<i64>,
    /// Matter group id.
    #[arg(long)]
    group: i64,
  },

  /// Refresh an office's queue state once.
  Update {
    #[arg(long)]
    office: Option<String>,
  },

  /// Refresh on a timer and print queue state after each pass.
  Watch {
    #[arg(long)]
    office: Option<String>,
    /// Seconds between refresh passes.
    #[arg(long, default_value_t = 60)]
    interval: u64,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings: Settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("KOLEJKA"))
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("failed to deserialise settings")?;

  let store = match &settings.cache_path {
    Some(path) => SqliteStore::open(path)
      .await
      .with_context(|| format!("failed to open cache at {path:?}"))?,
    None => SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory cache")?,
  };

  let api_key = settings.api_key()?;
  let source = WsStoreClient::new(
    settings.html_url.clone(),
    settings.json_url.clone(),
    &api_key,
  )?;

  let mut client = CachedClient::new(source, store)
    .with_cooldown(Duration::from_secs(settings.cooldown_secs));
  if let Some(key) = &settings.office_key {
    client.set_office_key(key.clone());
  }

  match cli.command {
    Command::Offices => {
      for office in client.office_list().await? {
        println!("{}  {}", office.key, office.name);
      }
    }
    Command::Matters { office } => {
      for matter in client.matter_list(office.as_deref()).await? {
        println!(
          "{:>4} {:>6}  {}",
          matter.ordinal.map_or("-".into(), |o| o.to_string()),
          matter.group_id,
          matter.name
        );
      }
    }
    Command::Samples {
      office,
      ordinal,
      group,
    } => {
      let samples = client.sample_list(office.as_deref(), ordinal, group).await?;
      for sample in samples {
        println!(
          "{}  queue {:>3}  counters {:>2}  serving {}",
          sample.time.format("%Y-%m-%d %H:%M"),
          sample.queue_length,
          sample.open_counters,
          sample.current_number
        );
      }
    }
    Command::Update { office } => {
      report(client.update(office.as_deref()).await?);
    }
    Command::Watch { office, interval } => {
      let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
      loop {
        ticker.tick().await;
        match client.update(office.as_deref()).await {
          Ok(outcome) => {
            report(outcome);
            print_queue_state(&client, office.as_deref()).await?;
          }
          Err(error) => tracing::error!(%error, "refresh failed"),
        }
      }
    }
  }

  Ok(())
}

fn report(outcome: kolejka_cache::UpdateOutcome) {
  if !outcome.fetched {
    tracing::info!("within cooldown, cache is current");
    return;
  }
  tracing::info!(
    new_matters = outcome.new_matters,
    new_samples = outcome.new_samples,
    "refreshed"
  );
  for failure in &outcome.failures {
    tracing::warn!(matter = %failure.matter, error = %failure.error, "matter skipped");
  }
}

/// Print each matter with its most recent cached sample.
async fn print_queue_state<S, T>(
  client: &CachedClient<S, T>,
  office: Option<&str>,
) -> anyhow::Result<()>
where
  S: QueueSource,
  T: QueueStore,
{
  for matter in client.matter_list(office).await? {
    let samples = client
      .sample_list(office, matter.ordinal, matter.group_id)
      .await?;
    match samples.last() {
      Some(sample) => println!(
        "{:<50} queue {:>3}  counters {:>2}  serving {}",
        matter.name, sample.queue_length, sample.open_counters, sample.current_number
      ),
      None => println!("{:<50} no samples yet", matter.name),
    }
  }
  Ok(())
}
