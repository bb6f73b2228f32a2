//! The on-disk state between commands: the working tree and the snapshot of the last sync.
//!
//! Edits only touch `tree.json`. `pull` and `push` rewrite both files so that the next `status`
//! or `push` can diff the working tree against what the backend is known to hold.

use crate::tree::Tree;
use crate::{utils, Config, Result};
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// The tree as it was after a pull or push, and when that happened.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Snapshot {
    pub synced_at: DateTime<Utc>,
    pub tree: Tree,
}

#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    tree_path: PathBuf,
    snapshot_path: PathBuf,
}

impl Workspace {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            tree_path: config.tree_path(),
            snapshot_path: config.snapshot_path(),
        }
    }

    /// Loads the working tree.
    ///
    /// # Errors
    /// - If nothing has been pulled yet, or the file cannot be parsed.
    pub(crate) async fn load_tree(&self) -> Result<Tree> {
        if !self.tree_path.is_file() {
            bail!("There is no working tree yet, run 'bommel pull' first")
        }
        utils::deserialize(&self.tree_path)
            .await
            .context("Unable to load the working tree")
    }

    pub(crate) async fn save_tree(&self, tree: &Tree) -> Result<()> {
        debug!("Saving {} Bommels to {}", tree.len(), self.tree_path.display());
        utils::serialize(&self.tree_path, tree)
            .await
            .context("Unable to save the working tree")
    }

    /// The snapshot of the last sync, if there has been one.
    pub(crate) async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        if !self.snapshot_path.is_file() {
            return Ok(None);
        }
        let snapshot = utils::deserialize(&self.snapshot_path)
            .await
            .context("Unable to load the sync snapshot")?;
        Ok(Some(snapshot))
    }

    /// Saves `tree` as both the working tree and a snapshot stamped with the current time.
    pub(crate) async fn record_sync(&self, tree: &Tree) -> Result<Snapshot> {
        let snapshot = Snapshot {
            synced_at: Utc::now(),
            tree: tree.clone(),
        };
        utils::serialize(&self.snapshot_path, &snapshot)
            .await
            .context("Unable to save the sync snapshot")?;
        self.save_tree(tree).await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeId;
    use crate::test::TestEnv;
    use crate::tree::tests::wide;

    #[tokio::test]
    async fn test_missing_tree_asks_for_pull() {
        let env = TestEnv::new().await;
        let workspace = Workspace::new(&env.config());
        let err = workspace.load_tree().await.unwrap_err();
        assert!(err.to_string().contains("bommel pull"));
        assert!(workspace.load_snapshot().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_edits_do_not_touch_the_snapshot() {
        let env = TestEnv::new().await;
        let workspace = Workspace::new(&env.config());
        let before = Utc::now();
        let snapshot = workspace.record_sync(&wide()).await.unwrap();
        assert!(snapshot.synced_at >= before);

        let edited = wide().rename_node(NodeId::new(2), "Renamed").unwrap();
        workspace.save_tree(&edited).await.unwrap();

        assert_eq!(workspace.load_tree().await.unwrap(), edited);
        let loaded = workspace.load_snapshot().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.tree, wide());
    }

    #[tokio::test]
    async fn test_invalid_tree_file_is_rejected() {
        let env = TestEnv::new().await;
        let config = env.config();
        // two nodes share an id
        let json = r#"{"nodes": [
            {"id": 1, "parent_id": 0, "label": "a", "droppable": true},
            {"id": 1, "parent_id": 0, "label": "b", "droppable": true}
        ]}"#;
        utils::write(config.tree_path(), json).await.unwrap();
        let workspace = Workspace::new(&config);
        assert!(workspace.load_tree().await.is_err());
    }
}
