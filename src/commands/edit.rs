//! Edit command handlers. These change the working tree only; `push` sends the changes.

use crate::args::{AddArgs, DeleteArgs, MoveArgs, RenameArgs};
use crate::commands::{bommels, Out};
use crate::model::{NodeId, TreeNode};
use crate::tree::Tree;
use crate::workspace::Workspace;
use crate::{Config, Result};
use anyhow::{bail, Context};

/// Adds a provisional Bommel under `args.parent()`.
pub async fn add(config: Config, args: AddArgs) -> Result<Out<TreeNode>> {
    let workspace = Workspace::new(&config);
    let tree = workspace.load_tree().await?;
    let (tree, node) = tree.create_node(args.parent(), args.label())?;
    let tree = match args.emoji() {
        Some(emoji) => tree.set_emoji(node.id(), Some(emoji))?,
        None => tree,
    };
    workspace.save_tree(&tree).await?;
    let node = saved(&tree, node.id())?;
    Ok(Out::new(
        format!("Added '{}' as Bommel {}", node.label(), node.id()),
        node,
    ))
}

/// Renames a Bommel and/or changes its emoji. An empty emoji removes it.
pub async fn rename(config: Config, args: RenameArgs) -> Result<Out<TreeNode>> {
    if args.label().is_none() && args.emoji().is_none() {
        bail!("Nothing to change, give a new name or --emoji")
    }
    let workspace = Workspace::new(&config);
    let mut tree = workspace.load_tree().await?;
    if let Some(label) = args.label() {
        tree = tree.rename_node(args.id(), label)?;
    }
    if let Some(emoji) = args.emoji() {
        tree = tree.set_emoji(args.id(), Some(emoji))?;
    }
    workspace.save_tree(&tree).await?;
    let node = saved(&tree, args.id())?;
    Ok(Out::new(format!("Updated Bommel {}", node.id()), node))
}

/// Deletes a Bommel. A Bommel with children is only deleted together with them, when
/// `args.recursive()` is set.
pub async fn delete(config: Config, args: DeleteArgs) -> Result<Out<Vec<NodeId>>> {
    let workspace = Workspace::new(&config);
    let tree = workspace.load_tree().await?;
    let mut removed = tree.descendants(args.id())?;
    let tree = if args.recursive() {
        tree.delete_subtree(args.id())?
    } else if !removed.is_empty() {
        bail!(
            "Bommel {} has {} beneath it, use --recursive to delete them too",
            args.id(),
            bommels(removed.len())
        )
    } else {
        tree.delete_node(args.id())?
    };
    workspace.save_tree(&tree).await?;
    removed.insert(0, args.id());
    Ok(Out::new(format!("Deleted {}", bommels(removed.len())), removed))
}

/// Moves a Bommel under `args.target()`.
pub async fn move_node(config: Config, args: MoveArgs) -> Result<Out<TreeNode>> {
    let workspace = Workspace::new(&config);
    let tree = workspace.load_tree().await?;
    let tree = tree.move_node(args.id(), args.target())?;
    workspace.save_tree(&tree).await?;
    let node = saved(&tree, args.id())?;
    Ok(Out::new(
        format!("Moved Bommel {} under {}", node.id(), args.target()),
        node,
    ))
}

fn saved(tree: &Tree, id: NodeId) -> Result<TreeNode> {
    tree.get(id)
        .cloned()
        .with_context(|| format!("Bommel {id} is missing after the edit"))
}
