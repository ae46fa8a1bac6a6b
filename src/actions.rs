//! What each user action means for the selected row.

use crate::error::{Error, Result};
use crate::model::{Entity, FileEntry, Hunk, NodeId};
use crate::orchestrator::Orchestrator;
use crate::patch;
use crate::process::CommandRunner;
use crate::tree::TreeEngine;
use crate::vcs::{CommandSpec, Phase, Vcs};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Update,
    Strip,
    Revert,
    Commit { message: String },
    Amend { message: String },
    Duplicate,
    Uncommit,
    Shelve { name: Option<String> },
    Unshelve,
    DeleteShelve,
    PhaseGet,
    PhaseSet(Phase),
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Strip => "strip",
            Action::Revert => "revert",
            Action::Commit { .. } => "commit",
            Action::Amend { .. } => "amend",
            Action::Duplicate => "duplicate",
            Action::Uncommit => "uncommit",
            Action::Shelve { .. } => "shelve",
            Action::Unshelve => "unshelve",
            Action::DeleteShelve => "delete shelve",
            Action::PhaseGet => "phase",
            Action::PhaseSet(_) => "set phase",
        }
    }

    /// Destructive actions ask before running.
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            Action::Revert
                | Action::Strip
                | Action::DeleteShelve
                | Action::Unshelve
                | Action::Uncommit
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    Run { spec: CommandSpec, refresh: bool },
    RevertHunk { file: FileEntry, hunk: Hunk },
}

impl Plan {
    pub fn refreshes(&self) -> bool {
        match self {
            Plan::Run { refresh, .. } => *refresh,
            Plan::RevertHunk { .. } => true,
        }
    }
}

fn mutation(spec: CommandSpec) -> Plan {
    Plan::Run {
        spec,
        refresh: true,
    }
}

/// Revision of the changeset a row belongs to; the working copy has none.
fn owning_rev(tree: &TreeEngine, node: NodeId) -> Result<Option<String>> {
    match tree.entity(tree.top_level(node)) {
        Some(Entity::Changeset(c)) => Ok(c.rev.clone()),
        Some(Entity::Shelve(_)) => Err(Error::Unsupported("not available inside a shelve".to_string())),
        _ => Err(Error::NothingSelected),
    }
}

fn committed_rev(tree: &TreeEngine, node: NodeId, action: &Action) -> Result<String> {
    owning_rev(tree, node)?.ok_or_else(|| {
        Error::Unsupported(format!("{} needs a committed changeset", action.label()))
    })
}

fn shelve_name(tree: &TreeEngine, node: NodeId) -> Result<String> {
    tree.entity(tree.top_level(node))
        .and_then(Entity::as_shelve)
        .map(|s| s.name.clone())
        .ok_or_else(|| Error::Unsupported("select a shelve".to_string()))
}

pub fn plan(tree: &TreeEngine, node: NodeId, action: &Action, vcs: &Vcs) -> Result<Plan> {
    let entity = tree.entity(node).ok_or(Error::NothingSelected)?;
    let plan = match action {
        Action::Update => mutation(vcs.update(&committed_rev(tree, node, action)?)),
        Action::Strip => mutation(vcs.strip(&committed_rev(tree, node, action)?)),
        Action::Duplicate => mutation(vcs.duplicate(&committed_rev(tree, node, action)?)),
        Action::PhaseGet => Plan::Run {
            spec: vcs.phase_get(&committed_rev(tree, node, action)?),
            refresh: false,
        },
        Action::PhaseSet(phase) => {
            mutation(vcs.phase_set(&committed_rev(tree, node, action)?, *phase))
        }
        Action::Revert => revert(tree, node, entity, vcs)?,
        Action::Commit { message } => mutation(vcs.commit(non_empty(message)?)),
        Action::Amend { message } => mutation(vcs.amend(non_empty(message)?)),
        Action::Uncommit => mutation(vcs.uncommit()),
        Action::Shelve { name } => {
            let name = name.as_deref().map(str::trim).filter(|n| !n.is_empty());
            let paths: Vec<&str> = match entity {
                Entity::File(f) if matches!(owning_rev(tree, node), Ok(None)) => vec![f.path.as_str()],
                _ => Vec::new(),
            };
            mutation(vcs.shelve_create(name, &paths))
        }
        Action::Unshelve => mutation(vcs.unshelve(&shelve_name(tree, node)?)),
        Action::DeleteShelve => mutation(vcs.shelve_delete(&shelve_name(tree, node)?)),
    };
    Ok(plan)
}

fn non_empty(message: &str) -> Result<&str> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::Unsupported("empty commit message".to_string()));
    }
    Ok(message)
}

/// Hunks and files undo the change they show; a changeset restores the
/// working copy to its content.
fn revert(tree: &TreeEngine, node: NodeId, entity: &Entity, vcs: &Vcs) -> Result<Plan> {
    let rev = owning_rev(tree, node)?;
    let plan = match entity {
        Entity::Hunk(_) => {
            let (file, hunk) = tree.hunk_file(node).ok_or(Error::NothingSelected)?;
            Plan::RevertHunk {
                file: file.clone(),
                hunk: hunk.clone(),
            }
        }
        Entity::File(f) => {
            let before = rev.map(|r| format!("{}^", r));
            mutation(vcs.revert_paths(&[f.path.as_str()], before.as_deref()))
        }
        Entity::Changeset(_) => mutation(vcs.revert_all(rev.as_deref())),
        Entity::Shelve(_) => {
            return Err(Error::Unsupported("shelves cannot be reverted".to_string()));
        }
    };
    Ok(plan)
}

/// Runs a plan and returns the captured tool output.
pub async fn execute<R: CommandRunner>(
    orch: &Orchestrator<R>,
    vcs: &Vcs,
    plan: &Plan,
) -> Result<String> {
    match plan {
        Plan::Run { spec, .. } => {
            tracing::info!(command = %spec, "running mutation");
            orch.run_one(&spec.program, spec).await
        }
        Plan::RevertHunk { file, hunk } => patch::revert_hunk(orch, vcs, file, hunk).await,
    }
}
