//! Cursor movement over the display sequence. Nothing here fetches or
//! mutates; every function answers with the row to move to.

use crate::error::{Error, Result};
use crate::model::NodeId;
use crate::tree::{RowId, TreeEngine};

fn node_at(tree: &TreeEngine, row: RowId) -> Result<NodeId> {
    tree.rows()
        .get(row)
        .and_then(|r| r.node())
        .ok_or(Error::NothingSelected)
}

/// Row of the selected node's parent.
pub fn up(tree: &TreeEngine, from: RowId) -> Result<RowId> {
    let node = node_at(tree, from)?;
    let parent = tree.parent(node).ok_or(Error::NoParent)?;
    let mut cur = tree.rows().prev(from);
    while let Some(row) = cur {
        if tree.rows().get(row).and_then(|r| r.node()) == Some(parent) {
            return Ok(row);
        }
        cur = tree.rows().prev(row);
    }
    Err(Error::NoParent)
}

/// The next row, provided it is a child of the selected node.
pub fn down(tree: &TreeEngine, from: RowId) -> Result<RowId> {
    let node = node_at(tree, from)?;
    let next = tree.rows().next(from).ok_or(Error::NoChild)?;
    match tree.rows().get(next).and_then(|r| r.node()) {
        Some(child) if tree.parent(child) == Some(node) => Ok(next),
        _ => Err(Error::NoChild),
    }
}

pub fn next_same_level(tree: &TreeEngine, from: RowId, n: usize) -> Result<RowId> {
    same_level(tree, from, n, |row| tree.rows().next(row))
}

pub fn prev_same_level(tree: &TreeEngine, from: RowId, n: usize) -> Result<RowId> {
    same_level(tree, from, n, |row| tree.rows().prev(row))
}

fn same_level(
    tree: &TreeEngine,
    from: RowId,
    n: usize,
    step: impl Fn(RowId) -> Option<RowId>,
) -> Result<RowId> {
    let level = tree.parent(node_at(tree, from)?);
    let mut cur = from;
    let mut passed = 0;
    while passed < n {
        cur = step(cur).ok_or(Error::NoSibling)?;
        // Separators have no owner and never count.
        let Some(node) = tree.rows().get(cur).and_then(|r| r.node()) else {
            continue;
        };
        if tree.parent(node) == level {
            passed += 1;
        }
    }
    Ok(cur)
}
