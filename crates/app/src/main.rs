use std::path::{Path, PathBuf};

use anyhow::Context;
use ledgerlink_ingest::{ingest_document, ingest_statement, ExtractedDocument, StatementProfile};
use ledgerlink_recon::{MatchConfig, ReconEngine, WeightedScorer};
use ledgerlink_storage::SqliteStore;
use serde::Deserialize;
use tokio::sync::mpsc;

/// Daemon settings, read from `ledgerlink.toml` in the config directory.
/// Everything has a default so a missing file just works.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppConfig {
    /// Where dropped statement/document files are picked up.
    /// Defaults to `<data dir>/inbox`.
    inbox_dir: Option<PathBuf>,
    matching: MatchConfig,
    statement_profile: Option<StatementProfile>,
}

fn load_config(config_dir: &Path) -> anyhow::Result<AppConfig> {
    let path = config_dir.join("ledgerlink.toml");
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Spawn a notify watcher on `watch_dir` that sends new file paths to `tx`.
/// Returns the watcher — it must be kept alive for watching to continue.
fn spawn_intake_watcher(
    watch_dir: &Path,
    tx: mpsc::Sender<PathBuf>,
) -> notify::Result<impl notify::Watcher> {
    use notify::{EventKind, RecursiveMode, Watcher};

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        if let Ok(ev) = event {
            if matches!(ev.kind, EventKind::Create(_)) {
                for path in ev.paths {
                    let _ = tx.try_send(path);
                }
            }
        }
    })?;

    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

async fn process_drop(
    store: &SqliteStore,
    engine: &ReconEngine<WeightedScorer>,
    profile: &StatementProfile,
    path: &Path,
) -> anyhow::Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            let outcome = ingest_statement(store, engine, file, profile, &filename, None).await?;
            tracing::info!(
                transactions = outcome.transactions_created,
                matched = outcome.reconciliation.matched,
                breakdown_entries = outcome.reconciliation.breakdown_entries,
                "statement ingested: {filename}"
            );
        }
        "json" => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let extracted: ExtractedDocument = serde_json::from_str(&content)
                .with_context(|| format!("parsing extracted fields in {}", path.display()))?;
            let outcome = ingest_document(store, engine, extracted).await?;
            tracing::info!(
                document_id = outcome.document_id,
                matched = outcome.reconciliation.matched,
                breakdown_entries = outcome.reconciliation.breakdown_entries,
                "document ingested: {filename}"
            );
        }
        other => {
            tracing::debug!("ignoring inbox file with unhandled extension '{other}': {filename}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let project_dirs = directories::ProjectDirs::from("com", "anomalyco", "LedgerLink")
        .context("no home directory for app data")?;
    let data_dir = project_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir).context("creating data directory")?;

    let config = load_config(project_dirs.config_dir())?;

    let db_path = data_dir.join("ledger.db");
    let pool = ledgerlink_storage::create_db(&db_path)
        .await
        .context("opening database")?;
    let store = SqliteStore::new(pool);

    let inbox_dir = config
        .inbox_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("inbox"));
    std::fs::create_dir_all(&inbox_dir).context("creating inbox directory")?;

    let engine = ReconEngine::new(config.matching.clone());
    let profile = config.statement_profile.clone().unwrap_or_default();

    // ── Intake pipeline ───────────────────────────────────────────────────────
    // The channel bridges the notify watcher thread and the async processor.
    let (drop_tx, mut drop_rx) = mpsc::channel::<PathBuf>(64);

    let store_for_pipeline = store.clone();
    tokio::spawn(async move {
        while let Some(path) = drop_rx.recv().await {
            tracing::info!("processing inbox file: {}", path.display());
            if let Err(e) = process_drop(&store_for_pipeline, &engine, &profile, &path).await {
                tracing::warn!("intake failed for {}: {e:#}", path.display());
            }
        }
    });

    // The watcher must be kept alive for the duration of the daemon.
    let _watcher =
        spawn_intake_watcher(&inbox_dir, drop_tx).context("starting inbox watcher")?;
    tracing::info!("watching inbox: {}", inbox_dir.display());

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutting down");
    Ok(())
}
