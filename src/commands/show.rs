use crate::api::Backend;
use crate::args::ShowArgs;
use crate::commands::Out;
use crate::model::{Amount, NodeId, TreeNode};
use crate::tree::{AggregateMode, Tree};
use crate::workspace::Workspace;
use crate::{Config, Result};
use anyhow::Context;
use std::collections::HashSet;

/// Prints the working tree, one Bommel per line and indented by depth, with its figures.
///
/// The backend supplies each Bommel's own statistics; roll-ups are computed locally so that
/// unpushed moves are reflected.
pub async fn show(
    config: Config,
    backend: &mut (dyn Backend + Send),
    args: ShowArgs,
) -> Result<Out<Tree>> {
    let tree = Workspace::new(&config).load_tree().await?;
    let include_drafts = args.statistics().include_drafts() || config.include_drafts();
    let mode = AggregateMode::from_flag(args.statistics().aggregate());

    let mut own = backend
        .all_bommel_statistics(config.organization_id(), include_drafts, false)
        .await
        .context("Unable to fetch the Bommel statistics")?;
    // a provisional id can collide with an id the backend handed out elsewhere
    own.retain(|id, _| tree.get(*id).is_some_and(|n| !n.is_provisional()));
    let tree = tree.with_statistics(&own).with_aggregates(mode);

    let mut lines = vec![format!(
        "{} Bommels, {} figures{}",
        tree.len(),
        mode,
        if include_drafts { " with drafts" } else { "" }
    )];
    lines.extend(render(&tree, config.currency()));
    Ok(Out::new(lines.join("\n"), tree))
}

/// Depth-first lines starting at the root and at any Bommel whose parent is missing. Bommels on
/// a parent cycle are listed last.
fn render(tree: &Tree, currency: &str) -> Vec<String> {
    let index = tree.child_index();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut lines = Vec::with_capacity(tree.len());
    let starts = tree.nodes().iter().filter(|n| match tree.structural_parent(n) {
        None => true,
        Some(parent) => !tree.contains(parent),
    });
    for start in starts {
        let mut stack = vec![(start.id(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = tree.get(id) {
                lines.push(line(node, depth, currency));
            }
            if let Some(children) = index.get(&id) {
                stack.extend(children.iter().rev().map(|c| (*c, depth + 1)));
            }
        }
    }
    for node in tree.nodes().iter().filter(|n| !visited.contains(&n.id())) {
        lines.push(format!("{} (parent cycle)", line(node, 0, currency)));
    }
    lines
}

fn line(node: &TreeNode, depth: usize, currency: &str) -> String {
    let mut s = "  ".repeat(depth);
    if let Some(emoji) = node.emoji() {
        s.push_str(emoji);
        s.push(' ');
    }
    s.push_str(&format!("{} [{}]", node.label(), node.id()));
    if node.is_provisional() {
        s.push_str(" (new)");
    }
    if let Some(stats) = node.statistics() {
        s.push_str(&format!(
            "  {}  ({} transactions)",
            Amount::new(stats.total, currency),
            stats.transactions_count
        ));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{AddArgs, StatisticsArgs};
    use crate::commands::{add, pull};
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_show_aggregated() {
        let env = TestEnv::new().await;
        let mut backend = env.backend();
        pull(env.config(), backend.as_mut()).await.unwrap();
        add(env.config(), AddArgs::new(NodeId::new(3), "Stage", None))
            .await
            .unwrap();

        let args = ShowArgs::new(StatisticsArgs::new(true, false));
        let out = show(env.config(), backend.as_mut(), args).await.unwrap();
        let lines: Vec<&str> = out.message().lines().collect();
        assert_eq!(lines[0], "5 Bommels, descendants figures");
        assert_eq!(
            lines[1],
            "Test Organization [1]  969.50 €  (4 transactions)"
        );
        assert_eq!(lines[2], "  🎉 Events [2]  669.50 €  (3 transactions)");
        assert!(lines[3].starts_with("    Summer Festival [3]"));
        assert_eq!(lines[4], "      Stage [5] (new)  0.00 €  (0 transactions)");
        assert!(lines[5].starts_with("  ⚽ Sports [4]  300.00 €"));

        let tree = out.structure().unwrap();
        let root = tree.get(NodeId::new(1)).unwrap().statistics().unwrap();
        assert_eq!(root.sub_bommels_count, Some(4));
    }

    #[tokio::test]
    async fn test_show_own_with_drafts() {
        let env = TestEnv::new().await;
        let mut backend = env.backend();
        pull(env.config(), backend.as_mut()).await.unwrap();
        let args = ShowArgs::new(StatisticsArgs::new(false, true));
        let out = show(env.config(), backend.as_mut(), args).await.unwrap();
        assert!(out.message().starts_with("4 Bommels, own figures with drafts"));
        assert!(out
            .message()
            .contains("⚽ Sports [4]  180.00 €  (2 transactions)"));
        assert!(out
            .message()
            .contains("Test Organization [1]  0.00 €  (0 transactions)"));
    }

    #[test]
    fn test_render_lists_cycles_last() {
        use crate::tree::tests::{node, root};
        let tree = Tree::new(vec![
            root(1, "Org"),
            node(2, 3, "a"),
            node(3, 2, "b"),
            node(4, 0, "c"),
        ])
        .unwrap();
        let lines = render(&tree, "€");
        assert_eq!(lines[0], "Org [1]");
        assert_eq!(lines[1], "  c [4]");
        assert_eq!(lines[2], "a [2] (parent cycle)");
        assert_eq!(lines[3], "b [3] (parent cycle)");
    }
}
