//! Bot runner: executes work items with admission control

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, watch};
use tracing::{debug, error, info, info_span, warn};

use super::config::RunnerConfig;
use super::item::{Bot, WorkItem, may_run_together};

/// Runner statistics
#[derive(Debug, Clone, Default)]
pub struct RunnerStats {
    pub total_submitted: u64,
    pub total_coalesced: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub peak_concurrent: usize,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
}

struct Running {
    id: u64,
    item: Arc<dyn WorkItem>,
}

/// Internal state protected by mutex
struct RunnerInner {
    /// Items waiting for admission, oldest first
    pending: VecDeque<Arc<dyn WorkItem>>,

    /// Items currently executing
    running: Vec<Running>,

    next_id: u64,
    stats: RunnerStats,
}

/// Runs work items submitted directly or produced by bots.
///
/// An item is admitted only when it may run together with every running
/// item and fewer than `max_concurrent` items are running. Pending items
/// with the same name as a newly submitted item absorb it.
pub struct BotRunner {
    config: RunnerConfig,
    bots: Vec<Arc<dyn Bot>>,
    inner: Arc<Mutex<RunnerInner>>,
    notify: Arc<Notify>,
}

impl BotRunner {
    pub fn new(config: RunnerConfig, bots: Vec<Arc<dyn Bot>>) -> Self {
        debug!(?config, bots = bots.len(), "BotRunner::new: called");
        Self {
            config,
            bots,
            inner: Arc::new(Mutex::new(RunnerInner {
                pending: VecDeque::new(),
                running: Vec::new(),
                next_id: 0,
                stats: RunnerStats::default(),
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Queue an item for execution
    pub async fn submit(&self, item: Arc<dyn WorkItem>) {
        let mut inner = self.inner.lock().await;
        enqueue(&mut inner, item);
        drop(inner);
        self.notify.notify_one();
    }

    /// Snapshot of the statistics
    pub async fn stats(&self) -> RunnerStats {
        self.inner.lock().await.stats.clone()
    }

    /// Number of pending and running items
    pub async fn load(&self) -> (usize, usize) {
        let inner = self.inner.lock().await;
        (inner.pending.len(), inner.running.len())
    }

    /// Run `items`, and everything they produce, to completion
    pub async fn run_until_idle(&self, items: Vec<Arc<dyn WorkItem>>) {
        debug!(items = items.len(), "BotRunner::run_until_idle: called");
        {
            let mut inner = self.inner.lock().await;
            for item in items {
                enqueue(&mut inner, item);
            }
        }

        loop {
            self.dispatch().await;
            if self.is_idle().await {
                break;
            }
            self.notify.notified().await;
        }
        debug!("BotRunner::run_until_idle: idle");
    }

    /// Submit every bot's periodic items once per period until `shutdown`
    /// turns true, then wait for running items to finish.
    pub async fn run_periodic(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            period_secs = self.config.period_secs,
            max_concurrent = self.config.max_concurrent,
            "Starting bot runner"
        );
        let mut ticker = tokio::time::interval(self.config.period());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("BotRunner::run_periodic: tick");
                    let mut inner = self.inner.lock().await;
                    for bot in &self.bots {
                        for item in bot.periodic_items() {
                            enqueue(&mut inner, item);
                        }
                    }
                }
                _ = self.notify.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested");
                        break;
                    }
                }
            }
            self.dispatch().await;
        }

        let dropped = {
            let mut inner = self.inner.lock().await;
            let n = inner.pending.len();
            inner.pending.clear();
            n
        };
        if dropped > 0 {
            debug!(dropped, "BotRunner::run_periodic: dropped pending items");
        }
        while !self.is_idle().await {
            self.notify.notified().await;
        }
        info!("Bot runner stopped");
    }

    async fn is_idle(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.pending.is_empty() && inner.running.is_empty()
    }

    /// Start every pending item that can be admitted right now
    async fn dispatch(&self) {
        let mut inner = self.inner.lock().await;
        let max = self.config.max_concurrent.max(1);

        let mut index = 0;
        while index < inner.pending.len() && inner.running.len() < max {
            let candidate = &inner.pending[index];
            let admissible = inner
                .running
                .iter()
                .all(|r| may_run_together(candidate.as_ref(), r.item.as_ref()));
            if !admissible {
                debug!(item = %candidate, "BotRunner::dispatch: held back by running item");
                index += 1;
                continue;
            }

            let Some(item) = inner.pending.remove(index) else {
                break;
            };
            let id = inner.next_id;
            inner.next_id += 1;
            inner.running.push(Running { id, item: item.clone() });
            inner.stats.peak_concurrent = inner.stats.peak_concurrent.max(inner.running.len());
            inner.stats.last_started = Some(Utc::now());
            self.spawn(id, item);
        }
    }

    fn spawn(&self, id: u64, item: Arc<dyn WorkItem>) {
        let scratch: PathBuf = self.config.scratch_dir.clone();
        let inner = self.inner.clone();
        let notify = self.notify.clone();

        tokio::spawn(async move {
            let name = item.to_string();
            let worker = item.clone();
            let result = tokio::task::spawn_blocking(move || {
                let span = info_span!("work_item", item = %worker);
                let _enter = span.enter();
                worker.run(&scratch)
            })
            .await;

            let mut inner = inner.lock().await;
            inner.running.retain(|r| r.id != id);
            inner.stats.last_finished = Some(Utc::now());
            match result {
                Ok(Ok(produced)) => {
                    inner.stats.total_completed += 1;
                    debug!(item = %name, produced = produced.len(), "Work item completed");
                    for next in produced {
                        enqueue(&mut inner, next);
                    }
                }
                Ok(Err(e)) => {
                    inner.stats.total_failed += 1;
                    warn!(item = %name, "Work item failed: {:#}", e);
                }
                Err(e) => {
                    inner.stats.total_failed += 1;
                    error!(item = %name, "Work item panicked: {}", e);
                }
            }
            drop(inner);
            notify.notify_one();
        });
    }
}

fn enqueue(inner: &mut RunnerInner, item: Arc<dyn WorkItem>) {
    inner.stats.total_submitted += 1;
    let name = item.to_string();
    if inner.pending.iter().any(|p| p.to_string() == name) {
        debug!(item = %name, "enqueue: coalesced with pending item");
        inner.stats.total_coalesced += 1;
        return;
    }
    inner.pending.push_back(item);
}
