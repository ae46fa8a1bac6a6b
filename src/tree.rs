//! The lazily expanding revision tree and its flat display sequence.

use std::collections::{HashMap, HashSet};

use futures_util::future::join_all;

use crate::error::{Error, Result};
use crate::hierarchy;
use crate::model::{Arena, Changeset, Entity, FileEntry, Hunk, Node, NodeId};
use crate::orchestrator::Orchestrator;
use crate::parse::{
    parse_changesets, parse_file_diff, parse_revisions, parse_shelve_diff, parse_shelve_list,
    parse_status_files,
};
use crate::process::CommandRunner;
use crate::vcs::{CommandSpec, Vcs};

/// Stable handle to a row. Handles are never reused within one population,
/// so a handle to a removed row simply stops resolving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    History,
    Shelves,
}

impl Section {
    pub fn label(self) -> &'static str {
        match self {
            Section::History => "history",
            Section::Shelves => "shelves",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Row {
    Node(NodeId),
    Separator(Section),
}

impl Row {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Row::Node(id) => Some(id),
            Row::Separator(_) => None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    row: Row,
    prev: Option<RowId>,
    next: Option<RowId>,
}

/// Doubly linked list of rows with a node-to-row index.
#[derive(Debug, Default)]
pub struct DisplaySequence {
    slots: Vec<Option<Slot>>,
    head: Option<RowId>,
    tail: Option<RowId>,
    by_node: HashMap<NodeId, RowId>,
    len: usize,
}

impl DisplaySequence {
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = None;
        self.tail = None;
        self.by_node.clear();
        self.len = 0;
    }

    fn slot(&self, id: RowId) -> Option<&Slot> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: RowId) -> Option<&mut Slot> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    fn alloc(&mut self, row: Row, prev: Option<RowId>, next: Option<RowId>) -> RowId {
        let id = RowId(self.slots.len());
        self.slots.push(Some(Slot { row, prev, next }));
        if let Row::Node(n) = row {
            self.by_node.insert(n, id);
        }
        self.len += 1;
        id
    }

    pub fn push_back(&mut self, row: Row) -> RowId {
        let prev = self.tail;
        let id = self.alloc(row, prev, None);
        match prev.and_then(|p| self.slot_mut(p)) {
            Some(p) => p.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Inserts `row` right after `at`; appends if `at` no longer exists.
    pub fn insert_after(&mut self, at: RowId, row: Row) -> RowId {
        let Some(next) = self.slot(at).map(|s| s.next) else {
            return self.push_back(row);
        };
        let id = self.alloc(row, Some(at), next);
        if let Some(s) = self.slot_mut(at) {
            s.next = Some(id);
        }
        match next.and_then(|n| self.slot_mut(n)) {
            Some(n) => n.prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    pub fn remove(&mut self, id: RowId) -> Option<Row> {
        let slot = self.slots.get_mut(id.0)?.take()?;
        match slot.prev.and_then(|p| self.slot_mut(p)) {
            Some(p) => p.next = slot.next,
            None => self.head = slot.next,
        }
        match slot.next.and_then(|n| self.slot_mut(n)) {
            Some(n) => n.prev = slot.prev,
            None => self.tail = slot.prev,
        }
        if let Row::Node(n) = slot.row {
            self.by_node.remove(&n);
        }
        self.len -= 1;
        Some(slot.row)
    }

    pub fn get(&self, id: RowId) -> Option<Row> {
        self.slot(id).map(|s| s.row)
    }

    pub fn next(&self, id: RowId) -> Option<RowId> {
        self.slot(id).and_then(|s| s.next)
    }

    pub fn prev(&self, id: RowId) -> Option<RowId> {
        self.slot(id).and_then(|s| s.prev)
    }

    pub fn first(&self) -> Option<RowId> {
        self.head
    }

    pub fn last(&self) -> Option<RowId> {
        self.tail
    }

    pub fn row_of(&self, node: NodeId) -> Option<RowId> {
        self.by_node.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            seq: self,
            cur: self.head,
        }
    }

    pub fn position(&self, id: RowId) -> Option<usize> {
        self.iter().position(|(r, _)| r == id)
    }

    pub fn nth(&self, n: usize) -> Option<RowId> {
        self.iter().nth(n).map(|(r, _)| r)
    }
}

pub struct Iter<'a> {
    seq: &'a DisplaySequence,
    cur: Option<RowId>,
}

impl Iterator for Iter<'_> {
    type Item = (RowId, Row);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let slot = self.seq.slot(id)?;
        self.cur = slot.next;
        Some((id, slot.row))
    }
}

/// Outputs of one refresh round, by position in `Vcs::refresh_specs`.
#[derive(Clone, Debug, Default)]
pub struct RefreshOutputs {
    pub log: String,
    pub pending_status: String,
    pub current_status: String,
    pub parents: String,
    pub shelves: String,
}

impl TryFrom<Vec<String>> for RefreshOutputs {
    type Error = Error;

    fn try_from(outputs: Vec<String>) -> Result<Self> {
        let got = outputs.len();
        let Ok([log, pending_status, current_status, parents, shelves]) =
            <[String; 5]>::try_from(outputs)
        else {
            return Err(Error::MissingOutput { expected: 5, got });
        };
        Ok(Self {
            log,
            pending_status,
            current_status,
            parents,
            shelves,
        })
    }
}

/// What has to be fetched before a node's children are known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetch {
    Status { rev: Option<String> },
    Diff { path: String, rev: Option<String> },
    ShelvePatch { name: String },
}

impl Fetch {
    pub fn specs(&self, vcs: &Vcs) -> Vec<CommandSpec> {
        let spec = match self {
            Fetch::Status { rev } => vcs.status(rev.as_deref()),
            Fetch::Diff { path, rev } => vcs.diff(path, rev.as_deref()),
            Fetch::ShelvePatch { name } => vcs.shelve_patch(name),
        };
        vec![spec]
    }

    pub fn label(&self) -> String {
        match self {
            Fetch::Status { rev: Some(rev) } => format!("status {}", rev),
            Fetch::Status { rev: None } => "status".to_string(),
            Fetch::Diff { path, .. } => format!("diff {}", path),
            Fetch::ShelvePatch { name } => format!("shelve {}", name),
        }
    }
}

/// A pending expansion, valid only for the population it was planned in.
#[derive(Clone, Debug)]
pub struct FetchPlan {
    pub node: NodeId,
    pub generation: u64,
    pub fetch: Fetch,
}

#[derive(Clone, Debug)]
pub enum Expansion {
    Done,
    Fetch(FetchPlan),
    /// A fetch for this node is already running.
    InFlight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPlan {
    ticket: u64,
}

/// Identity of a node that survives a rebuild, used to restore the cursor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey(Vec<String>);

#[derive(Debug, Default)]
pub struct TreeEngine {
    arena: Arena,
    rows: DisplaySequence,
    history: Vec<NodeId>,
    generation: u64,
    refresh_ticket: u64,
    applied_ticket: u64,
    // Nodes with a fetch planned in this generation and not yet finished.
    in_flight: HashSet<NodeId>,
}

impl TreeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &DisplaySequence {
        &self.rows
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn entity(&self, id: NodeId) -> Option<&Entity> {
        self.arena.get(id).map(|n| &n.entity)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.parent(id)
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.arena.depth(id)
    }

    /// Changesets of the fetched history window, in log order.
    /// `Changeset::parent_revs`/`child_revs` index into this slice.
    pub fn history(&self) -> &[NodeId] {
        &self.history
    }

    pub fn changeset(&self, id: NodeId) -> Option<&Changeset> {
        self.entity(id).and_then(Entity::as_changeset)
    }

    pub fn find_changeset(&self, rev: &str) -> Option<NodeId> {
        self.history
            .iter()
            .copied()
            .find(|&id| self.changeset(id).and_then(|c| c.rev.as_deref()) == Some(rev))
    }

    /// Top-level node a row belongs to.
    pub fn top_level(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(p) = self.arena.parent(cur) {
            cur = p;
        }
        cur
    }

    /// The file a hunk belongs to, with the diff preamble needed to replay it.
    pub fn hunk_file(&self, hunk: NodeId) -> Option<(&FileEntry, &Hunk)> {
        let h = self.entity(hunk)?.as_hunk()?;
        let f = self.entity(self.parent(hunk)?)?.as_file()?;
        Some((f, h))
    }

    pub fn is_shelved(&self, id: NodeId) -> bool {
        self.entity(self.top_level(id))
            .is_some_and(|e| e.as_shelve().is_some())
    }

    pub fn begin_refresh(&mut self) -> RefreshPlan {
        self.refresh_ticket += 1;
        RefreshPlan {
            ticket: self.refresh_ticket,
        }
    }

    /// Applies a refresh round unless a newer one has already been applied.
    pub fn finish_refresh(&mut self, plan: RefreshPlan, outputs: Vec<String>) -> Result<bool> {
        if plan.ticket < self.applied_ticket {
            tracing::info!(
                ticket = plan.ticket,
                applied = self.applied_ticket,
                "dropping superseded refresh"
            );
            return Ok(false);
        }
        self.rebuild(RefreshOutputs::try_from(outputs)?);
        self.applied_ticket = plan.ticket;
        Ok(true)
    }

    /// Replaces the whole population from a fresh refresh round.
    pub fn rebuild(&mut self, out: RefreshOutputs) {
        self.arena.clear();
        self.rows.clear();
        self.history.clear();
        self.in_flight.clear();
        self.generation += 1;

        let pending = parse_status_files(&out.pending_status, None);
        if !pending.is_empty() {
            let id = self.arena.insert(Entity::Changeset(Changeset::pending()), None);
            self.attach_files(id, pending);
            self.rows.push_back(Row::Node(id));
            self.splice_expand(id);
        }

        self.rows.push_back(Row::Separator(Section::History));
        let mut changesets = parse_changesets(&out.log);
        hierarchy::link(&mut changesets);
        let parents = parse_revisions(&out.parents);
        let current: HashSet<&str> = parents.iter().map(String::as_str).collect();
        // `status --change .` describes the first parent only.
        let first_parent = parents.first().cloned();

        for mut cs in changesets {
            cs.current = cs.rev.as_deref().is_some_and(|r| current.contains(r));
            let attach = cs.rev.is_some() && cs.rev == first_parent;
            let rev = cs.rev.clone();
            let id = self.arena.insert(Entity::Changeset(cs), None);
            self.history.push(id);
            self.rows.push_back(Row::Node(id));
            if attach {
                let files = parse_status_files(&out.current_status, rev.as_deref());
                self.attach_files(id, files);
                self.splice_expand(id);
            }
        }

        self.rows.push_back(Row::Separator(Section::Shelves));
        for shelve in parse_shelve_list(&out.shelves) {
            let id = self.arena.insert(Entity::Shelve(shelve), None);
            self.rows.push_back(Row::Node(id));
        }

        tracing::info!(
            generation = self.generation,
            changesets = self.history.len(),
            rows = self.rows.len(),
            "tree rebuilt"
        );
    }

    fn attach_files(&mut self, owner: NodeId, files: Vec<FileEntry>) {
        let ids = files
            .into_iter()
            .map(|f| self.arena.insert(Entity::File(f), Some(owner)))
            .collect();
        if let Some(node) = self.arena.get_mut(owner) {
            node.children = Some(ids);
        }
    }

    /// Expands from cache, or says what must be fetched first.
    pub fn begin_expand(&mut self, id: NodeId, force: bool) -> Result<Expansion> {
        let node = self.arena.get(id).ok_or(Error::NothingSelected)?;
        if !node.entity.is_expandable() {
            return Ok(Expansion::Done);
        }
        // Shelved files come with their hunks; there is nothing to refetch.
        let shelved_file = node.entity.as_file().is_some() && self.is_shelved(id);
        if node.children.is_some() && (!force || shelved_file) {
            self.splice_expand(id);
            return Ok(Expansion::Done);
        }

        if shelved_file {
            self.set_children(id, Vec::new());
            self.splice_expand(id);
            return Ok(Expansion::Done);
        }

        let fetch = match &node.entity {
            Entity::Changeset(c) => Fetch::Status { rev: c.rev.clone() },
            Entity::File(f) => Fetch::Diff {
                path: f.path.clone(),
                rev: f.rev.clone(),
            },
            Entity::Shelve(s) => Fetch::ShelvePatch {
                name: s.name.clone(),
            },
            Entity::Hunk(_) => return Ok(Expansion::Done),
        };
        if !self.in_flight.insert(id) {
            return Ok(Expansion::InFlight);
        }
        Ok(Expansion::Fetch(FetchPlan {
            node: id,
            generation: self.generation,
            fetch,
        }))
    }

    /// Caches fetched children and splices them in. Returns false for plans
    /// made against an earlier population.
    pub fn finish_expand(&mut self, plan: FetchPlan, outputs: Vec<String>) -> bool {
        if plan.generation != self.generation || self.arena.get(plan.node).is_none() {
            tracing::info!(
                planned = plan.generation,
                current = self.generation,
                fetch = %plan.fetch.label(),
                "dropping stale expansion"
            );
            return false;
        }
        let id = plan.node;
        self.in_flight.remove(&id);
        let text = outputs.into_iter().next().unwrap_or_default();

        // Forced refetch of an open node: take the old rows out first.
        if self.arena.get(id).is_some_and(|n| n.expanded) {
            self.collapse(id);
        }

        let children: Vec<NodeId> = match plan.fetch {
            Fetch::Status { rev } => parse_status_files(&text, rev.as_deref())
                .into_iter()
                .map(|f| self.arena.insert(Entity::File(f), Some(id)))
                .collect(),
            Fetch::Diff { .. } => {
                let diff = parse_file_diff(&text);
                if let Some(Entity::File(f)) = self.arena.get_mut(id).map(|n| &mut n.entity) {
                    f.header = diff.header;
                }
                diff.hunks
                    .into_iter()
                    .map(|h| self.arena.insert(Entity::Hunk(h), Some(id)))
                    .collect()
            }
            Fetch::ShelvePatch { .. } => {
                let mut files = Vec::new();
                for shelved in parse_shelve_diff(&text) {
                    let fid = self.arena.insert(Entity::File(shelved.file), Some(id));
                    let hunks = shelved
                        .hunks
                        .into_iter()
                        .map(|h| self.arena.insert(Entity::Hunk(h), Some(fid)))
                        .collect();
                    self.set_children(fid, hunks);
                    files.push(fid);
                }
                files
            }
        };
        tracing::debug!(node = id.index(), children = children.len(), "children fetched");
        self.set_children(id, children);
        self.splice_expand(id);
        true
    }

    /// Forgets a fetch that failed so the node can be expanded again.
    pub fn abandon_expand(&mut self, plan: &FetchPlan) {
        if plan.generation == self.generation {
            self.in_flight.remove(&plan.node);
        }
    }

    fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        if let Some(node) = self.arena.get_mut(id) {
            node.children = Some(children);
        }
    }

    /// Opens a node that has a row. Hidden nodes stay closed and keep their
    /// cache for when an ancestor shows them again.
    fn splice_expand(&mut self, id: NodeId) {
        let Some(row) = self.rows.row_of(id) else {
            return;
        };
        let Some(node) = self.arena.get_mut(id) else {
            return;
        };
        if node.expanded {
            return;
        }
        node.expanded = true;
        self.insert_children_after(id, row);
    }

    /// Inserts the materializable subtree of `id` after `at` in pre-order.
    fn insert_children_after(&mut self, id: NodeId, at: RowId) -> RowId {
        let children = self
            .arena
            .get(id)
            .and_then(|n| n.children.clone())
            .unwrap_or_default();
        let mut last = at;
        for child in children {
            last = self.rows.insert_after(last, Row::Node(child));
            if self.arena.get(child).is_some_and(|n| n.expanded) {
                last = self.insert_children_after(child, last);
            }
        }
        last
    }

    /// Removes every materialized descendant of `id` and closes the subtree.
    /// Cached children are kept.
    pub fn collapse(&mut self, id: NodeId) {
        if self.arena.get(id).is_none() {
            return;
        }
        if let Some(row) = self.rows.row_of(id) {
            let mut subtree: HashSet<NodeId> = HashSet::from([id]);
            let mut doomed = Vec::new();
            let mut cur = self.rows.next(row);
            while let Some(r) = cur {
                cur = self.rows.next(r);
                let Some(n) = self.rows.get(r).and_then(Row::node) else {
                    break;
                };
                match self.arena.parent(n) {
                    Some(p) if subtree.contains(&p) => {
                        subtree.insert(n);
                        doomed.push(r);
                    }
                    // Pre-order: the first row outside the subtree ends it.
                    _ => break,
                }
            }
            for r in doomed {
                self.rows.remove(r);
            }
        }

        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.arena.get_mut(n) {
                node.expanded = false;
                if let Some(children) = &node.children {
                    stack.extend(children.iter().copied());
                }
            }
        }
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(|n| n.expanded)
    }

    pub async fn refresh<R: CommandRunner>(
        &mut self,
        orch: &Orchestrator<R>,
        vcs: &Vcs,
    ) -> Result<()> {
        let plan = self.begin_refresh();
        let outputs = orch.run_all("refresh", &vcs.refresh_specs()).await?;
        self.finish_refresh(plan, outputs)?;
        Ok(())
    }

    pub async fn expand<R: CommandRunner>(
        &mut self,
        id: NodeId,
        force: bool,
        orch: &Orchestrator<R>,
        vcs: &Vcs,
    ) -> Result<()> {
        if let Expansion::Fetch(plan) = self.begin_expand(id, force)? {
            match orch.run_all(&plan.fetch.label(), &plan.fetch.specs(vcs)).await {
                Ok(outputs) => {
                    self.finish_expand(plan, outputs);
                }
                Err(err) => {
                    self.abandon_expand(&plan);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    pub async fn toggle<R: CommandRunner>(
        &mut self,
        id: NodeId,
        force: bool,
        orch: &Orchestrator<R>,
        vcs: &Vcs,
    ) -> Result<()> {
        if self.is_expanded(id) {
            self.collapse(id);
            Ok(())
        } else {
            self.expand(id, force, orch, vcs).await
        }
    }

    /// Expands `nodes` with one concurrent round of fetches.
    pub async fn expand_many<R: CommandRunner>(
        &mut self,
        nodes: &[NodeId],
        orch: &Orchestrator<R>,
        vcs: &Vcs,
    ) -> Result<()> {
        let mut plans = Vec::new();
        for &id in nodes {
            if let Expansion::Fetch(plan) = self.begin_expand(id, false)? {
                plans.push(plan);
            }
        }
        let rounds = plans
            .iter()
            .map(|p| async move { orch.run_all(&p.fetch.label(), &p.fetch.specs(vcs)).await });
        let results = join_all(rounds).await;
        let mut failure = None;
        for (plan, result) in plans.into_iter().zip(results) {
            match result {
                Ok(outputs) => {
                    self.finish_expand(plan, outputs);
                }
                Err(err) => {
                    self.abandon_expand(&plan);
                    failure.get_or_insert(err);
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// Opens every changeset and shelve, then every file below them.
    pub async fn expand_all<R: CommandRunner>(
        &mut self,
        orch: &Orchestrator<R>,
        vcs: &Vcs,
    ) -> Result<()> {
        let top: Vec<NodeId> = self.rows.iter().filter_map(|(_, r)| r.node()).collect();
        self.expand_many(&top, orch, vcs).await?;
        let files: Vec<NodeId> = self
            .rows
            .iter()
            .filter_map(|(_, r)| r.node())
            .filter(|&id| self.entity(id).is_some_and(|e| e.as_file().is_some()))
            .collect();
        self.expand_many(&files, orch, vcs).await
    }

    pub fn key(&self, id: NodeId) -> Option<NodeKey> {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            let part = match self.entity(n)? {
                Entity::Changeset(c) => format!("cs:{}", c.rev.as_deref().unwrap_or("")),
                Entity::File(f) => format!("file:{}", f.path),
                Entity::Hunk(h) => format!("hunk:{}", h.lines.first().map(String::as_str).unwrap_or("")),
                Entity::Shelve(s) => format!("shelve:{}", s.name),
            };
            parts.push(part);
            cur = self.parent(n);
        }
        parts.reverse();
        Some(NodeKey(parts))
    }

    /// Finds the materialized row whose node has `key`.
    pub fn locate(&self, key: &NodeKey) -> Option<RowId> {
        self.rows
            .iter()
            .find(|(_, row)| row.node().and_then(|n| self.key(n)).as_ref() == Some(key))
            .map(|(r, _)| r)
    }

    /// Indented plain-text rendering of the display sequence.
    pub fn outline(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (_, row) in self.rows.iter() {
            match row {
                Row::Separator(section) => out.push(format!("-- {} --", section.label())),
                Row::Node(id) => {
                    let Some(node) = self.arena.get(id) else {
                        continue;
                    };
                    let indent = "  ".repeat(self.depth(id));
                    let marker = match (node.entity.is_expandable(), node.expanded) {
                        (false, _) => "",
                        (true, true) => "- ",
                        (true, false) => "+ ",
                    };
                    for (i, line) in node.entity.row_lines().iter().enumerate() {
                        if i == 0 {
                            out.push(format!("{}{}{}", indent, marker, line));
                        } else {
                            out.push(format!("{}{}", indent, line));
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
changeset: c3
summary: third
parent: c2
tag: tip
changeset: c2
summary: second
parent: c1
changeset: c1
summary: first
parent: 000000000000
";

    fn outputs() -> RefreshOutputs {
        RefreshOutputs {
            log: LOG.to_string(),
            pending_status: "M a.txt\n? new.txt\n".to_string(),
            current_status: "A b.txt\n".to_string(),
            parents: "c2\n".to_string(),
            shelves: "wip (1h ago) changes to: third\n".to_string(),
        }
    }

    fn built() -> TreeEngine {
        let mut t = TreeEngine::new();
        t.rebuild(outputs());
        t
    }

    fn rows(t: &TreeEngine) -> Vec<Row> {
        t.rows().iter().map(|(_, r)| r).collect()
    }

    #[test]
    fn rebuild_layout() {
        let t = built();
        assert_eq!(
            t.outline(),
            vec![
                "- Pending changes",
                "  + M a.txt",
                "  + ? new.txt",
                "-- history --",
                "+ o c3 [tip] third",
                "- @ c2 second",
                "  + A b.txt",
                "+ o c1 first",
                "-- shelves --",
                "+ wip (1h ago) changes to: third",
            ]
        );
        assert_eq!(t.history().len(), 3);
        let c2 = t.find_changeset("c2").unwrap();
        assert!(t.changeset(c2).unwrap().current);
        let b = t.node(c2).unwrap().children.clone().unwrap();
        assert_eq!(t.entity(b[0]).and_then(Entity::as_file).and_then(|f| f.rev.as_deref()), Some("c2"));
    }

    #[test]
    fn rebuild_without_pending_changes() {
        let mut t = TreeEngine::new();
        t.rebuild(RefreshOutputs {
            pending_status: String::new(),
            ..outputs()
        });
        assert_eq!(t.rows().get(t.rows().first().unwrap()), Some(Row::Separator(Section::History)));
        let pending = t.rows().iter().filter(|(_, r)| {
            r.node().and_then(|n| t.changeset(n)).is_some_and(Changeset::is_pending)
        });
        assert_eq!(pending.count(), 0);
    }

    #[test]
    fn hierarchy_is_resolved_through_history() {
        let t = built();
        let c3 = t.changeset(t.history()[0]).unwrap();
        let parent = t.history()[c3.parent_revs[0]];
        assert_eq!(t.changeset(parent).unwrap().rev.as_deref(), Some("c2"));
    }

    #[test]
    fn collapse_then_cached_expand_restores_rows() {
        let mut t = built();
        let pending = t.rows().iter().find_map(|(_, r)| r.node()).unwrap();
        let before = rows(&t);
        t.collapse(pending);
        assert_eq!(t.rows().len(), before.len() - 2);
        assert!(!t.is_expanded(pending));
        assert!(t.node(pending).unwrap().children.is_some());

        assert!(matches!(t.begin_expand(pending, false).unwrap(), Expansion::Done));
        assert_eq!(rows(&t), before);
    }

    #[test]
    fn expand_then_collapse_is_identity() {
        let mut t = built();
        let c3 = t.find_changeset("c3").unwrap();
        let before = rows(&t);
        let Expansion::Fetch(plan) = t.begin_expand(c3, false).unwrap() else {
            panic!("c3 has no cached children");
        };
        assert_eq!(plan.fetch, Fetch::Status { rev: Some("c3".to_string()) });
        assert!(t.finish_expand(plan, vec!["M x\nM y\n".to_string()]));
        assert_eq!(t.rows().len(), before.len() + 2);
        t.collapse(c3);
        assert_eq!(rows(&t), before);
    }

    #[test]
    fn collapse_closes_nested_levels() {
        let mut t = built();
        let c3 = t.find_changeset("c3").unwrap();
        let Expansion::Fetch(plan) = t.begin_expand(c3, false).unwrap() else {
            panic!();
        };
        t.finish_expand(plan, vec!["M x\n".to_string()]);
        let x = t.node(c3).unwrap().children.clone().unwrap()[0];
        let Expansion::Fetch(plan) = t.begin_expand(x, false).unwrap() else {
            panic!();
        };
        assert_eq!(plan.fetch, Fetch::Diff { path: "x".to_string(), rev: Some("c3".to_string()) });
        t.finish_expand(
            plan,
            vec!["diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n".to_string()],
        );
        assert_eq!(t.entity(x).and_then(Entity::as_file).unwrap().header.len(), 3);
        let row_count = t.rows().len();

        t.collapse(c3);
        assert!(!t.is_expanded(x));
        assert_eq!(t.rows().len(), row_count - 2);

        // Re-expanding shows the file again, but closed.
        t.begin_expand(c3, false).unwrap();
        assert_eq!(t.rows().len(), row_count - 1);
        assert!(t.rows().row_of(x).is_some());
    }

    #[test]
    fn stale_plans_are_dropped_after_rebuild() {
        let mut t = built();
        let c1 = t.find_changeset("c1").unwrap();
        let Expansion::Fetch(plan) = t.begin_expand(c1, false).unwrap() else {
            panic!();
        };
        t.rebuild(outputs());
        let before = rows(&t);
        assert!(!t.finish_expand(plan, vec!["M z\n".to_string()]));
        assert_eq!(rows(&t), before);
    }

    #[test]
    fn only_latest_refresh_applies() {
        let mut t = TreeEngine::new();
        let first = t.begin_refresh();
        let second = t.begin_refresh();
        let out = |log: &str| {
            vec![log.to_string(), String::new(), String::new(), String::new(), String::new()]
        };
        assert!(t.finish_refresh(second, out("changeset: new1\n")).unwrap());
        assert!(!t.finish_refresh(first, out("changeset: old1\n")).unwrap());
        assert!(t.find_changeset("new1").is_some());
        assert!(t.find_changeset("old1").is_none());
    }

    #[test]
    fn older_refresh_applies_while_a_newer_one_runs() {
        let mut t = TreeEngine::new();
        let first = t.begin_refresh();
        let second = t.begin_refresh();
        let out = |log: &str| {
            vec![log.to_string(), String::new(), String::new(), String::new(), String::new()]
        };
        // The newer round may fail and never arrive; the older one still lands.
        assert!(t.finish_refresh(first, out("changeset: old1\n")).unwrap());
        assert!(t.find_changeset("old1").is_some());
        assert!(t.finish_refresh(second, out("changeset: new1\n")).unwrap());
        assert!(t.find_changeset("new1").is_some());
        assert!(!t.finish_refresh(first, out("changeset: old1\n")).unwrap());
    }

    #[test]
    fn late_fetch_under_a_collapsed_owner_stays_closed() {
        let mut t = built();
        let pending = t.rows().iter().find_map(|(_, r)| r.node()).unwrap();
        let a = t.node(pending).unwrap().children.clone().unwrap()[0];
        let Expansion::Fetch(plan) = t.begin_expand(a, false).unwrap() else {
            panic!("a.txt has no cached hunks");
        };
        t.collapse(pending);
        assert!(t.finish_expand(
            plan,
            vec!["diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-x\n+y\n".to_string()],
        ));
        assert!(!t.is_expanded(a));
        assert_eq!(t.node(a).unwrap().children.as_ref().map(Vec::len), Some(1));

        assert!(matches!(t.begin_expand(pending, false).unwrap(), Expansion::Done));
        assert_eq!(
            &t.outline()[..4],
            ["- Pending changes", "  + M a.txt", "  + ? new.txt", "-- history --"]
        );
        // The cached hunk shows without another fetch.
        assert!(matches!(t.begin_expand(a, false).unwrap(), Expansion::Done));
        assert_eq!(t.outline()[2], "    @@ -1 +1 @@");
    }

    #[test]
    fn repeated_expand_waits_for_the_running_fetch() {
        let mut t = built();
        let c1 = t.find_changeset("c1").unwrap();
        let Expansion::Fetch(plan) = t.begin_expand(c1, false).unwrap() else {
            panic!("c1 has no cached files");
        };
        assert!(matches!(t.begin_expand(c1, false).unwrap(), Expansion::InFlight));
        assert!(matches!(t.begin_expand(c1, true).unwrap(), Expansion::InFlight));

        assert!(t.finish_expand(plan, vec!["M z\n".to_string()]));
        assert!(matches!(t.begin_expand(c1, false).unwrap(), Expansion::Done));
        assert!(t.is_expanded(c1));
    }

    #[test]
    fn abandoned_fetch_can_be_retried() {
        let mut t = built();
        let c3 = t.find_changeset("c3").unwrap();
        let Expansion::Fetch(plan) = t.begin_expand(c3, false).unwrap() else {
            panic!();
        };
        t.abandon_expand(&plan);
        assert!(matches!(t.begin_expand(c3, false).unwrap(), Expansion::Fetch(_)));

        // A rebuild forgets fetches of the old population.
        t.rebuild(outputs());
        let c3 = t.find_changeset("c3").unwrap();
        assert!(matches!(t.begin_expand(c3, false).unwrap(), Expansion::Fetch(_)));
    }

    #[test]
    fn refresh_outputs_require_five_results() {
        let err = RefreshOutputs::try_from(vec![String::new(); 3]).unwrap_err();
        assert!(matches!(err, Error::MissingOutput { expected: 5, got: 3 }));
    }

    #[test]
    fn forced_refetch_replaces_children() {
        let mut t = built();
        let pending = t.rows().iter().find_map(|(_, r)| r.node()).unwrap();
        let Expansion::Fetch(plan) = t.begin_expand(pending, true).unwrap() else {
            panic!("force must refetch");
        };
        assert!(t.finish_expand(plan, vec!["R gone.txt\n".to_string()]));
        let lines = t.outline();
        assert_eq!(&lines[..3], ["- Pending changes", "  + R gone.txt", "-- history --"]);
    }

    #[test]
    fn shelve_expansion_caches_hunks() {
        let mut t = built();
        let shelve = t.rows().iter().filter_map(|(_, r)| r.node()).last().unwrap();
        let Expansion::Fetch(plan) = t.begin_expand(shelve, false).unwrap() else {
            panic!();
        };
        let patch = "wip (1h ago) x\ndiff --git a/s.txt b/s.txt\n--- a/s.txt\n+++ b/s.txt\n@@ -1 +1 @@\n-1\n+2\n";
        t.finish_expand(plan, vec![patch.to_string()]);
        let file = t.node(shelve).unwrap().children.clone().unwrap()[0];
        assert!(t.is_shelved(file));
        // Hunks are already known, even when a refetch is requested.
        assert!(matches!(t.begin_expand(file, true).unwrap(), Expansion::Done));
        assert_eq!(t.outline().last().map(String::as_str), Some("    +2"));
        let hunk = t.node(file).unwrap().children.clone().unwrap()[0];
        let (f, h) = t.hunk_file(hunk).unwrap();
        assert_eq!(f.path, "s.txt");
        assert_eq!(h.lines.len(), 3);
    }

    #[test]
    fn keys_survive_rebuild() {
        let mut t = built();
        let c2 = t.find_changeset("c2").unwrap();
        let file = t.node(c2).unwrap().children.clone().unwrap()[0];
        let key = t.key(file).unwrap();
        t.rebuild(outputs());
        let row = t.locate(&key).unwrap();
        let id = t.rows().get(row).and_then(Row::node).unwrap();
        assert_eq!(t.entity(id).and_then(Entity::as_file).map(|f| f.path.as_str()), Some("b.txt"));
    }

    #[test]
    fn display_sequence_links() {
        let mut seq = DisplaySequence::default();
        let a = seq.push_back(Row::Separator(Section::History));
        let c = seq.push_back(Row::Separator(Section::Shelves));
        let b = seq.insert_after(a, Row::Node(NodeId(7)));
        assert_eq!(seq.iter().map(|(r, _)| r).collect::<Vec<_>>(), [a, b, c]);
        assert_eq!(seq.row_of(NodeId(7)), Some(b));
        assert_eq!(seq.position(c), Some(2));
        assert_eq!(seq.remove(b), Some(Row::Node(NodeId(7))));
        assert_eq!(seq.row_of(NodeId(7)), None);
        assert_eq!(seq.next(a), Some(c));
        assert_eq!(seq.prev(c), Some(a));
        assert_eq!(seq.get(b), None);
        seq.remove(c);
        assert_eq!(seq.last(), Some(a));
        assert_eq!(seq.len(), 1);
    }
}
