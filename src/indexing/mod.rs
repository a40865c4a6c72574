//! The write side of the index: merging scanned trees into storage.
//!
//! [`IndexingManager::save_to_db`] merges one tree right away.
//! [`IndexingManager::queue_for_save`] goes through the [`SaveQueue`] first,
//! so saves whose lineages overlap run one after another in call order while
//! unrelated saves proceed in parallel.

pub mod merge;
pub mod preview;
pub mod queue;

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::albums;
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::model::Directory;
use crate::scanner::Scanner;

pub use merge::{MergeOptions, MergeOutcome, MergeStats};
pub use queue::{SaveQueue, Ticket};

/// Completion of a queued save.
pub struct SaveHandle {
    path: String,
    task: JoinHandle<Result<MergeStats>>,
}

impl SaveHandle {
    /// Relative path of the saved directory.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn wait(self) -> Result<MergeStats> {
        self.task.await?
    }
}

#[derive(Clone)]
pub struct IndexingManager {
    db: Arc<Database>,
    queue: Arc<SaveQueue>,
    config: Arc<Config>,
}

impl IndexingManager {
    pub fn new(db: Arc<Database>, config: Arc<Config>) -> Self {
        Self {
            db,
            queue: SaveQueue::new(),
            config,
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Saves queued or running.
    pub fn pending_saves(&self) -> usize {
        self.queue.len()
    }

    /// Merge `tree` into storage in one transaction.
    pub async fn save_to_db(&self, tree: Directory) -> Result<MergeStats> {
        let db = Arc::clone(&self.db);
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || save_blocking(&db, &config, &tree)).await?
    }

    /// Save `tree` once every earlier save of an overlapping lineage is done.
    ///
    /// The place in line is taken before this returns, so the call order
    /// decides the merge order. Must be called from within a tokio runtime.
    pub fn queue_for_save(&self, tree: Directory) -> SaveHandle {
        let mut ticket = self.queue.enqueue(tree.lineage_key());
        let path = tree.relative_path();
        let manager = self.clone();

        let task = tokio::spawn(async move {
            ticket.wait_turn().await?;
            let result = manager.save_to_db(tree).await;
            drop(ticket);
            result
        });

        SaveHandle { path, task }
    }

    /// Scan `relative` below the media folder and queue the result.
    /// Returns the scanned tree once it is stored.
    pub async fn index_directory(&self, relative: &str, deep: bool) -> Result<Directory> {
        let scanner = Scanner::new(self.config.media.folder.clone(), self.config.scanner.clone());
        let relative_owned = relative.to_string();
        let tree = tokio::task::spawn_blocking(move || scanner.scan_directory(&relative_owned, deep))
            .await??;

        tracing::info!(path = %relative, deep, "indexing directory");
        self.queue_for_save(tree.clone()).wait().await?;
        Ok(tree)
    }

    /// Delete the whole index. Saves still waiting for their turn are
    /// dropped; a save already running finishes first.
    pub async fn reset_db(&self) -> Result<()> {
        self.queue.cancel_pending();
        let mut ticket = self.queue.enqueue("");
        // Only a concurrent reset can cancel this one, and resetting twice
        // leaves the same empty index.
        let _ = ticket.wait_turn().await;

        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || db.reset()).await??;
        drop(ticket);

        tracing::info!("index reset");
        Ok(())
    }
}

fn save_blocking(db: &Database, config: &Config, tree: &Directory) -> Result<MergeStats> {
    let options = MergeOptions {
        index_meta_files: config.meta_file.enabled,
    };

    let outcome = match db.transaction(|tx| merge::save_directory(tx, tree, options)) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(path = %tree.relative_path(), error = %e, "saving directory failed");
            return Err(e);
        }
    };

    let stats = outcome.stats;
    tracing::debug!(
        path = %tree.relative_path(),
        directories_inserted = stats.directories_inserted,
        directories_removed = stats.directories_removed,
        media_inserted = stats.media_inserted,
        media_updated = stats.media_updated,
        media_removed = stats.media_removed,
        "saved directory"
    );

    if config.meta_file.enabled && config.album.enabled {
        if let Err(e) = albums::sync_saved_searches(db, &config.media.folder, tree) {
            tracing::warn!(path = %tree.relative_path(), error = %e, "importing saved searches failed");
        }
    }

    Ok(stats)
}
