use anyhow::{bail, Context, Result};
use clap::Parser;
use shared_playlists::config::{AggregationSettings, AppConfig, CliConfig, FileConfig};
use shared_playlists::{
    metrics, FileLibrarySource, Member, ProcessingStatus, RunStore, SharedLibrary,
    SqliteRunStore, StoreRunObserver,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Parses `id` or `id:Display Name`.
fn parse_member(s: &str) -> Result<Member> {
    let (id, name) = match s.split_once(':') {
        Some((id, name)) => (id.trim(), name.trim()),
        None => (s.trim(), s.trim()),
    };
    if id.is_empty() {
        bail!("Member id must not be empty");
    }
    Ok(Member::new(id, name))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the runs database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory of `<member>.json` library snapshots and the optional
    /// `enrichment.json`. Defaults to the db directory.
    #[clap(long, value_parser = parse_path)]
    pub libraries_dir: Option<PathBuf>,

    /// Member to aggregate, as `id` or `id:Display Name`. Repeat for each member.
    #[clap(long = "member", value_parser = parse_member, required = true)]
    pub members: Vec<Member>,

    /// Room identifier used for persistence and playlist export names.
    #[clap(long)]
    pub room: Option<String>,

    /// Delete failed runs of the room before starting.
    #[clap(long)]
    pub forget_failed: bool,

    /// Print Prometheus metrics once the run is over.
    #[clap(long)]
    pub print_metrics: bool,
}

/// Wait for the run to finish, expiring it on timeout, staleness or Ctrl+C.
async fn supervise(engine: &SharedLibrary, settings: &AggregationSettings) -> ProcessingStatus {
    let deadline = tokio::time::sleep(settings.processing_timeout());
    tokio::pin!(deadline);
    let mut staleness_check =
        tokio::time::interval(Duration::from_secs(settings.stale_after_secs.clamp(1, 60)));

    loop {
        tokio::select! {
            status = engine.wait_until_finished() => return status,
            _ = &mut deadline => {
                warn!(
                    "Run not finished after {:?}, expiring it",
                    settings.processing_timeout()
                );
                engine.expire().await;
                return engine.status();
            }
            _ = staleness_check.tick() => {
                if engine.expire_if_stale().await {
                    warn!("Run stopped reporting progress and was expired");
                    return engine.status();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, expiring run");
                engine.expire().await;
                return engine.status();
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir.clone(),
        libraries_dir: cli_args.libraries_dir.clone(),
        room_id: cli_args.room.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Opening runs database at {:?}...", config.runs_db_path());
    let store = Arc::new(SqliteRunStore::new(config.runs_db_path())?);

    // Runs left unfinished by a previous process can never complete
    for run in store.list_unfinished_runs()? {
        warn!(
            "Discarding run {} of room {} left unfinished ({}/{} members processed)",
            run.run_id, run.room_id, run.status.already_processed, run.status.total_to_process
        );
        store.delete_run(&run.run_id)?;
    }

    if cli_args.forget_failed {
        let deleted = store.delete_failed_runs(&config.room_id)?;
        info!("Deleted {} failed runs of room {}", deleted, config.room_id);
    }

    if let Some(previous) = store.latest_successful_run(&config.room_id)? {
        info!(
            "Room {} already has playlists from run {}",
            config.room_id, previous.run_id
        );
    }

    let engine = SharedLibrary::new(
        Arc::new(FileLibrarySource::new(&config.libraries_dir)),
        Arc::new(StoreRunObserver::new(store.clone(), config.room_id.clone())),
        config.aggregation.clone(),
    )?;

    let run_id = engine.start(cli_args.members.clone())?;
    info!("Run {} started for room {}", run_id, config.room_id);

    let status = supervise(&engine, &config.aggregation).await;
    info!(
        "Run {} ended {} after {}s",
        run_id,
        status.phase().as_str(),
        status.processing_time().num_seconds()
    );

    if cli_args.print_metrics {
        print!("{}", metrics::encode_metrics());
    }

    if !status.has_succeeded() {
        let reason = status
            .failure_reason
            .unwrap_or_else(|| "unknown reason".to_string());
        error!("Run {} failed: {}", run_id, reason);
        bail!("Aggregation failed: {}", reason);
    }

    for playlist in engine.get_playlists()? {
        println!(
            "{:>2}  {:<45} {:>5} tracks  {}",
            playlist.rank,
            playlist.export_name(&config.room_id),
            playlist.shared_track_count,
            playlist.id
        );
        for track in playlist.tracks_with_min_shared_count(config.aggregation.min_shared_count) {
            let artists: Vec<&str> = track.artists.iter().map(|a| a.name.as_str()).collect();
            println!(
                "      {} - {} ({} members)",
                artists.join(", "),
                track.name,
                playlist.members_sharing(track).len()
            );
        }
    }

    Ok(())
}
