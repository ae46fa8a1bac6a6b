mod common;

use anyhow::{Context, Result};

use hgtree::config::Config;
use hgtree::model::Entity;
use hgtree::orchestrator::Orchestrator;
use hgtree::tree::{Expansion, Row, TreeEngine};
use hgtree::vcs::Vcs;

use common::FakeRunner;

fn setup() -> (Orchestrator<FakeRunner>, Vcs) {
    (
        Orchestrator::new(FakeRunner::hg(), "."),
        Vcs::new(&Config::default()),
    )
}

fn rows(tree: &TreeEngine) -> Vec<Row> {
    tree.rows().iter().map(|(_, r)| r).collect()
}

#[tokio::test]
async fn refresh_maps_outputs_by_position() -> Result<()> {
    let (orch, vcs) = setup();
    let mut tree = TreeEngine::new();
    tree.refresh(&orch, &vcs).await?;

    assert_eq!(orch.runner().calls().len(), 5);
    assert_eq!(
        tree.outline(),
        vec![
            "- Pending changes",
            "  + M a.txt",
            "  + ? notes.txt",
            "-- history --",
            "+ o c3 [tip] third",
            "- @ c2 second",
            "  + A b.txt",
            "-- shelves --",
            "+ wip (1h ago) changes to: third",
        ]
    );

    let c3 = tree.find_changeset("c3").context("c3 in history")?;
    let cs = tree.changeset(c3).context("c3 is a changeset")?;
    assert_eq!(cs.phase(), Some("draft"));
    assert_eq!(cs.parents, ["c2"]);
    assert_eq!(cs.parent_revs, [1]);
    Ok(())
}

#[tokio::test]
async fn second_expand_uses_the_cache() -> Result<()> {
    let (orch, vcs) = setup();
    let mut tree = TreeEngine::new();
    tree.refresh(&orch, &vcs).await?;
    let c3 = tree.find_changeset("c3").context("c3 in history")?;

    tree.expand(c3, false, &orch, &vcs).await?;
    let expanded = rows(&tree);
    let text = tree.outline();
    tree.expand(c3, false, &orch, &vcs).await?;
    assert_eq!(orch.runner().count("status --change c3"), 1);
    assert_eq!(rows(&tree), expanded);

    tree.collapse(c3);
    tree.expand(c3, false, &orch, &vcs).await?;
    assert_eq!(orch.runner().count("status --change c3"), 1);
    assert_eq!(rows(&tree), expanded);

    tree.expand(c3, true, &orch, &vcs).await?;
    assert_eq!(orch.runner().count("status --change c3"), 2);
    assert_eq!(tree.outline(), text);
    Ok(())
}

#[tokio::test]
async fn collapse_undoes_expand_at_every_level() -> Result<()> {
    let (orch, vcs) = setup();
    let mut tree = TreeEngine::new();
    tree.refresh(&orch, &vcs).await?;
    let before = rows(&tree);

    let c3 = tree.find_changeset("c3").context("c3 in history")?;
    tree.toggle(c3, false, &orch, &vcs).await?;
    let file = tree
        .node(c3)
        .and_then(|n| n.children.clone())
        .and_then(|c| c.first().copied())
        .context("c3 has a file")?;
    tree.toggle(file, false, &orch, &vcs).await?;
    assert_eq!(orch.runner().count("diff --git -c c3 -- path:c3.txt"), 1);
    assert_eq!(rows(&tree).len(), before.len() + 3);

    tree.toggle(c3, false, &orch, &vcs).await?;
    assert_eq!(rows(&tree), before);
    assert!(!tree.is_expanded(file));
    Ok(())
}

#[tokio::test]
async fn diff_hunks_carry_line_numbers() -> Result<()> {
    let (orch, vcs) = setup();
    let mut tree = TreeEngine::new();
    tree.refresh(&orch, &vcs).await?;
    let pending = tree.rows().iter().find_map(|(_, r)| r.node()).context("pending row")?;
    let a = tree
        .node(pending)
        .and_then(|n| n.children.clone())
        .and_then(|c| c.first().copied())
        .context("pending file")?;

    tree.expand(a, false, &orch, &vcs).await?;
    assert_eq!(orch.runner().count("diff --git -- path:a.txt"), 1);

    let hunks = tree.node(a).and_then(|n| n.children.clone()).context("hunks")?;
    assert_eq!(hunks.len(), 2);
    let second = tree.entity(hunks[1]).and_then(Entity::as_hunk).context("hunk")?;
    assert_eq!(second.new_line_numbers(), [None, Some(9), Some(10)]);
    let (file, _) = tree.hunk_file(hunks[0]).context("hunk owner")?;
    assert_eq!(file.header.len(), 3);
    Ok(())
}

#[tokio::test]
async fn expansion_planned_before_a_refresh_is_dropped() -> Result<()> {
    let (orch, vcs) = setup();
    let mut tree = TreeEngine::new();
    tree.refresh(&orch, &vcs).await?;
    let c3 = tree.find_changeset("c3").context("c3 in history")?;
    let Expansion::Fetch(plan) = tree.begin_expand(c3, false)? else {
        anyhow::bail!("c3 should need a fetch");
    };

    tree.refresh(&orch, &vcs).await?;
    let before = rows(&tree);
    assert!(!tree.finish_expand(plan, vec!["M late.txt\n".to_string()]));
    assert_eq!(rows(&tree), before);
    Ok(())
}

#[tokio::test]
async fn expand_all_opens_everything_once() -> Result<()> {
    let (orch, vcs) = setup();
    let mut tree = TreeEngine::new();
    tree.refresh(&orch, &vcs).await?;
    tree.expand_all(&orch, &vcs).await?;

    let calls = orch.runner().calls();
    assert_eq!(orch.runner().count("status --change c3"), 1);
    // a.txt, notes.txt, b.txt and c3.txt; shelved files need no diff.
    assert_eq!(orch.runner().count("diff"), 4, "{:?}", calls);
    assert_eq!(orch.runner().count("--config extensions.shelve= shelve --patch"), 1);

    let lines = tree.outline();
    assert!(lines.iter().any(|l| l == "    +new"), "{:#?}", lines);
    assert!(lines.iter().any(|l| l == "    +ten"), "{:#?}", lines);
    Ok(())
}
