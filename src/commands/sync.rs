use crate::api::Backend;
use crate::commands::{bommels, Out};
use crate::sync::{self, ChangeKind, SyncOutcome, SyncPlan};
use crate::tree::Tree;
use crate::workspace::Workspace;
use crate::{Config, Result};
use anyhow::Context;
use tracing::{debug, warn};

/// Fetches the organization's tree and makes it both the working tree and the sync snapshot.
/// Unpushed local edits are lost.
pub async fn pull(config: Config, backend: &mut (dyn Backend + Send)) -> Result<Out<Tree>> {
    let workspace = Workspace::new(&config);
    if let (Ok(current), Some(snapshot)) = (
        workspace.load_tree().await,
        workspace.load_snapshot().await?,
    ) {
        let pending = sync::plan(&current, Some(&snapshot.tree))
            .map(|p| !p.is_empty())
            .unwrap_or(true);
        if pending {
            warn!("Discarding local changes that were not pushed");
        }
    }
    let tree = sync::pull(backend, config.organization_id()).await?;
    let snapshot = workspace.record_sync(&tree).await?;
    debug!("Snapshot taken at {}", snapshot.synced_at);
    Ok(Out::new(format!("Pulled {}", bommels(tree.len())), tree))
}

/// Lists what `push` would send.
pub async fn status(config: Config) -> Result<Out<SyncPlan>> {
    let workspace = Workspace::new(&config);
    let tree = workspace.load_tree().await?;
    let snapshot = workspace.load_snapshot().await?;
    let plan = sync::plan(&tree, snapshot.as_ref().map(|s| &s.tree))?;
    if plan.is_empty() {
        return Ok(Out::new("Nothing to push", plan));
    }

    let mut lines = vec![format!(
        "{} to create, {} to update, {} to delete",
        plan.count(ChangeKind::Create),
        plan.count(ChangeKind::Update),
        plan.count(ChangeKind::Delete)
    )];
    for change in plan
        .changes()
        .iter()
        .filter(|c| c.kind != ChangeKind::Unchanged)
    {
        lines.push(format!(
            "  {:<7} [{}] {}",
            change.kind,
            change.node.id(),
            change.node.label()
        ));
    }
    if let Some(snapshot) = &snapshot {
        lines.push(format!("Last synced at {}", snapshot.synced_at));
    }
    Ok(Out::new(lines.join("\n"), plan))
}

/// Sends the working tree's changes to the backend, then records the result as the new snapshot.
///
/// If a backend call fails, the changes sent before it stay on the backend and the local files
/// are left as they were. Run `pull` to start again from the backend's state.
pub async fn push(
    config: Config,
    backend: &mut (dyn Backend + Send),
) -> Result<Out<SyncOutcome>> {
    let workspace = Workspace::new(&config);
    let tree = workspace.load_tree().await?;
    let snapshot = workspace.load_snapshot().await?;
    let plan = sync::plan(&tree, snapshot.as_ref().map(|s| &s.tree))?;
    let outcome = sync::push(backend, config.organization_id(), &plan, &tree)
        .await
        .context("The push stopped part way, run 'bommel pull' to see what the backend holds")?;
    workspace.record_sync(&outcome.tree).await?;
    let message = format!(
        "Pushed {} created, {} updated, {} deleted",
        outcome.created, outcome.updated, outcome.deleted
    );
    Ok(Out::new(message, outcome))
}
