use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use cc_snapshot::cache::{CacheStore, RefreshScheduler};
use cc_snapshot::config::Config;
use cc_snapshot::fetch::RemoteFetcher;
use cc_snapshot::remote::RemoteClient;
use cc_snapshot::views::CacheView;

#[derive(Parser, Debug)]
#[command(name = "cc-snapshot")]
#[command(about = "Keep an in-memory snapshot of Cloud Controller and UAA data")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cc-snapshot/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Refresh continuously and log a summary after every interval
  Watch,
  /// Wait for one view to be available, print it as JSON and exit
  Show {
    #[arg(value_enum)]
    view: View,
  },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum View {
  Applications,
  Organizations,
  Spaces,
  Users,
  UsersDeep,
  Auditors,
  Developers,
  Managers,
  Counts,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let _guard = init_tracing(&config)?;

  let client = Arc::new(RemoteClient::new(&config)?);
  let store = Arc::new(CacheStore::new());
  let scheduler = RefreshScheduler::new(
    Arc::new(RemoteFetcher::new(client)),
    store.clone(),
    config.refresh_interval(),
  );
  let _handles = scheduler.spawn();
  let view = CacheView::new(store);

  info!(
    "Refreshing {} every {} seconds",
    config.cc_base(),
    config.refresh_interval
  );

  match args.command.unwrap_or(Command::Watch) {
    Command::Watch => watch(&view, &config).await,
    Command::Show { view: which } => show(&view, which).await,
  }
}

/// Install the tracing subscriber, writing to `log_file` when configured.
fn init_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
  let default_level = config.log_level.as_deref().unwrap_or("info");
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(default_level))
    .map_err(|e| eyre!("Invalid log level '{}': {}", default_level, e))?;

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false);

  match &config.log_file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
      let file = path
        .file_name()
        .ok_or_else(|| eyre!("log_file '{}' has no file name", path.display()))?;
      let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
      builder
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      builder
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;
      Ok(None)
    }
  }
}

async fn watch(view: &CacheView, config: &Config) -> Result<()> {
  let mut ticker = tokio::time::interval(config.refresh_interval());

  loop {
    tokio::select! {
      _ = ticker.tick() => {
        for status in view.status().await {
          if status.populated {
            info!(
              "{}: connected={} items={} refreshed_at={}",
              status.key,
              status.connected,
              status.item_count,
              status
                .refreshed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default()
            );
          } else {
            info!("{}: waiting for first refresh", status.key);
          }
        }
      }
      _ = tokio::signal::ctrl_c() => {
        info!("Interrupted, shutting down");
        return Ok(());
      }
    }
  }
}

async fn show(view: &CacheView, which: View) -> Result<()> {
  let output = match which {
    View::Applications => serde_json::to_value(&*view.applications().await)?,
    View::Organizations => serde_json::to_value(&*view.organizations().await)?,
    View::Spaces => serde_json::to_value(&*view.spaces().await)?,
    View::Users => serde_json::to_value(&*view.users().await)?,
    View::UsersDeep => serde_json::to_value(&*view.users_deep().await)?,
    View::Auditors => serde_json::to_value(view.spaces_auditors().await)?,
    View::Developers => serde_json::to_value(view.spaces_developers().await)?,
    View::Managers => serde_json::to_value(view.spaces_managers().await)?,
    View::Counts => json!({
      "applications": view.applications_count().await,
      "applications_running_instances": view.applications_running_instances().await,
      "applications_total_instances": view.applications_total_instances().await,
      "organizations": view.organizations_count().await,
      "spaces": view.spaces_count().await,
      "users": view.users_count().await,
    }),
  };

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
