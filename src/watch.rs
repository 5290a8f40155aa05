//! Incremental rebuilds on file changes.
//!
//! A poller task stamps the matched files every `poll_interval` and sends the
//! paths that changed over a channel. The coordinating loop waits for a burst
//! of changes to go quiet for `debounce`, runs a single rebuild on a blocking
//! thread, and only then collects the next batch. Changes that arrive during a
//! rebuild pile up in the channel and are drained into one follow-up batch.

use crate::errors::{GeneratorError, Result};
use crate::pipeline::{BuildOutput, Pipeline};
use crate::scanner::{ContentScanner, FileStamp};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const MIN_DEBOUNCE: Duration = Duration::from_millis(10);

/// A burst that never goes quiet is still cut off after this many windows
const MAX_WAIT_WINDOWS: u32 = 10;

pub type Snapshot = BTreeMap<PathBuf, FileStamp>;

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub debounce: Duration,
    pub poll_interval: Duration,
}

impl WatchOptions {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce: debounce.max(MIN_DEBOUNCE),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_DEBOUNCE);
        self
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Paths added, removed or modified between two snapshots
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> BTreeSet<PathBuf> {
    let mut changed: BTreeSet<PathBuf> = new
        .iter()
        .filter(|(path, stamp)| old.get(*path) != Some(*stamp))
        .map(|(path, _)| path.clone())
        .collect();
    changed.extend(old.keys().filter(|path| !new.contains_key(*path)).cloned());
    changed
}

/// Stamp the scanner's files periodically and report changed paths on `tx`.
/// Stops once the receiving side is gone.
pub fn spawn_poller(
    scanner: ContentScanner,
    initial: Snapshot,
    interval: Duration,
    tx: mpsc::UnboundedSender<PathBuf>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut previous = initial;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let scanner = scanner.clone();
            let current = match tokio::task::spawn_blocking(move || scanner.snapshot()).await {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(e)) => {
                    tracing::warn!("Snapshot failed: {}", e);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Snapshot task failed: {}", e);
                    continue;
                }
            };

            for path in diff_snapshots(&previous, &current) {
                tracing::trace!("Changed: {}", path.display());
                if tx.send(path).is_err() {
                    return;
                }
            }
            previous = current;
        }
    })
}

/// Wait for the next burst of changes and coalesce it into one batch.
///
/// Returns `None` once every sender is dropped and the channel is empty.
pub async fn next_batch(
    rx: &mut mpsc::UnboundedReceiver<PathBuf>,
    debounce: Duration,
) -> Option<BTreeSet<PathBuf>> {
    let debounce = debounce.max(MIN_DEBOUNCE);
    let first = rx.recv().await?;
    let mut batch = BTreeSet::from([first]);
    let deadline = Instant::now() + debounce * MAX_WAIT_WINDOWS;

    loop {
        match tokio::time::timeout(debounce, rx.recv()).await {
            Ok(Some(path)) => {
                batch.insert(path);
                if Instant::now() >= deadline {
                    break;
                }
            }
            Ok(None) | Err(_) => break,
        }
    }

    while let Ok(path) = rx.try_recv() {
        batch.insert(path);
    }
    Some(batch)
}

/// Build once, then rebuild on every batch of changes until `shutdown`
/// resolves. Hands the pipeline back when done.
pub async fn watch_until<S, F>(
    pipeline: Pipeline,
    options: WatchOptions,
    shutdown: S,
    mut on_build: F,
) -> Result<Pipeline>
where
    S: Future<Output = ()>,
    F: FnMut(&BuildOutput) -> Result<()>,
{
    let scanner = pipeline.scanner().clone();
    let initial = {
        let scanner = scanner.clone();
        tokio::task::spawn_blocking(move || scanner.snapshot())
            .await
            .map_err(|e| GeneratorError::Watch(e.to_string()))??
    };

    let (mut pipeline, first) = cycle(pipeline, None).await?;
    on_build(&first?)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let poller = spawn_poller(scanner, initial, options.poll_interval, tx);
    tracing::info!(
        "Watching for changes (debounce {} ms)",
        options.debounce.as_millis()
    );

    tokio::pin!(shutdown);
    loop {
        let batch = tokio::select! {
            _ = &mut shutdown => break,
            batch = next_batch(&mut rx, options.debounce) => batch,
        };
        let Some(batch) = batch else { break };

        tracing::info!("{} file(s) changed, rebuilding", batch.len());
        let (returned, output) = cycle(pipeline, Some(batch)).await?;
        pipeline = returned;
        match output {
            Ok(output) => on_build(&output)?,
            Err(e) => tracing::error!("Rebuild failed: {}", e),
        }
    }

    poller.abort();
    tracing::info!("Watch stopped");
    Ok(pipeline)
}

/// [`watch_until`] stopped by Ctrl-C
pub async fn watch<F>(pipeline: Pipeline, options: WatchOptions, on_build: F) -> Result<Pipeline>
where
    F: FnMut(&BuildOutput) -> Result<()>,
{
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    watch_until(pipeline, options, shutdown, on_build).await
}

/// Run one cycle off the async threads; the pipeline travels with the task
async fn cycle(
    mut pipeline: Pipeline,
    batch: Option<BTreeSet<PathBuf>>,
) -> Result<(Pipeline, Result<BuildOutput>)> {
    tokio::task::spawn_blocking(move || {
        let output = match &batch {
            Some(changed) => pipeline.rebuild(changed),
            None => pipeline.run(),
        };
        (pipeline, output)
    })
    .await
    .map_err(|e| GeneratorError::Watch(e.to_string()))
}
