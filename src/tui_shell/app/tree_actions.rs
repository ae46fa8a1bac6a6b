use super::*;

const HELP: &[(&str, &str)] = &[
    ("j / k, arrows", "move down / up"),
    ("Enter / Tab", "expand or collapse"),
    ("r", "expand, fetching again"),
    ("h / l", "go to parent / first child"),
    ("[n] J / K", "next / previous row on the same level"),
    ("g", "refresh everything"),
    ("i", "changeset details"),
    ("u", "update to changeset"),
    ("R", "revert hunk, file or changeset"),
    ("c / a", "commit / amend"),
    ("D", "duplicate changeset onto the working copy"),
    ("U", "uncommit"),
    ("s / S", "shelve / unshelve"),
    ("x", "delete shelve"),
    ("X", "strip changeset"),
    ("p / P", "show / set phase"),
    ("?", "this help"),
    ("q", "quit"),
];

impl App {
    pub(super) fn move_cursor(&mut self, down: bool) {
        self.ensure_cursor();
        let Some(mut cur) = self.cursor else {
            return;
        };
        let rows = self.tree.rows();
        loop {
            let next = if down { rows.next(cur) } else { rows.prev(cur) };
            let Some(next) = next else {
                return;
            };
            cur = next;
            if rows.get(cur).and_then(Row::node).is_some() {
                self.cursor = Some(cur);
                return;
            }
        }
    }

    pub(super) fn move_to_edge(&mut self, last: bool) {
        let rows = self.tree.rows();
        let found = if last {
            rows.iter().filter(|(_, r)| r.node().is_some()).last()
        } else {
            rows.iter().find(|(_, r)| r.node().is_some())
        };
        if let Some((id, _)) = found {
            self.cursor = Some(id);
        }
    }

    pub(super) fn toggle_selected(&mut self, force: bool) {
        let Some(node) = self.selected_node() else {
            return self.push_error(Error::NothingSelected.to_string());
        };
        if self.tree.is_expanded(node) && !force {
            self.tree.collapse(node);
            return;
        }
        match self.tree.begin_expand(node, force) {
            Ok(Expansion::Done) => {}
            Ok(Expansion::Fetch(plan)) => self.jobs.expand(plan),
            Ok(Expansion::InFlight) => self.push_notice("still loading".to_string()),
            Err(err) => self.push_error(err.to_string()),
        }
    }

    /// Runs a navigation step; dead ends leave the cursor where it is.
    pub(super) fn navigate(
        &mut self,
        step: impl FnOnce(&TreeEngine, RowId) -> crate::Result<RowId>,
    ) {
        self.ensure_cursor();
        let Some(from) = self.cursor else {
            return;
        };
        match step(&self.tree, from) {
            Ok(row) => self.cursor = Some(row),
            Err(err) if err.is_navigation() => self.push_notice(err.to_string()),
            Err(err) => self.push_error(err.to_string()),
        }
    }

    pub(super) fn take_count(&mut self) -> usize {
        self.count.take().unwrap_or(1).max(1)
    }

    pub(super) fn push_count_digit(&mut self, d: u32) {
        let n = self.count.unwrap_or(0).saturating_mul(10).saturating_add(d as usize);
        self.count = Some(n.min(9999));
    }

    pub(super) fn request(&mut self, action: Action) {
        let Some(node) = self.selected_node() else {
            return self.push_error(Error::NothingSelected.to_string());
        };
        let plan = match actions::plan(&self.tree, node, &action, &self.vcs) {
            Ok(p) => p,
            Err(err) => return self.push_error(err.to_string()),
        };
        let pending = PendingAction {
            label: action.label().to_string(),
            plan,
        };
        if action.requires_confirmation() {
            let lines = self.describe(node);
            self.open_confirm_modal(pending, lines);
        } else {
            self.execute_action_confirmed(pending);
        }
    }

    pub(in crate::tui_shell) fn execute_action_confirmed(&mut self, action: PendingAction) {
        tracing::info!(action = %action.label, "executing");
        self.jobs.mutate(action.label, action.plan);
    }

    pub(super) fn open_input(&mut self, kind: InputKind) {
        let node = self.selected_node();
        let target = node.and_then(|n| self.tree.key(n));
        let action = TextInputAction { kind, target };
        let summary = node
            .map(|n| self.tree.top_level(n))
            .and_then(|n| self.tree.changeset(n))
            .filter(|c| !c.is_pending())
            .map(|c| c.summary.clone());
        match kind {
            InputKind::Commit => {
                self.open_text_input_modal("Commit", "message: ", action, None, Vec::new())
            }
            InputKind::Amend => self.open_text_input_modal(
                "Amend",
                "message: ",
                action,
                summary,
                vec!["Amends the working copy's parent.".to_string()],
            ),
            InputKind::Shelve => self.open_text_input_modal(
                "Shelve",
                "name: ",
                action,
                None,
                vec!["Leave empty for a generated name.".to_string()],
            ),
            InputKind::SetPhase => self.open_text_input_modal(
                "Set phase",
                "phase: ",
                action,
                None,
                vec!["public, draft or secret".to_string()],
            ),
        }
    }

    pub(in crate::tui_shell) fn submit_text_input(&mut self, action: TextInputAction, value: String) {
        let node = match &action.target {
            Some(key) => match self.tree.locate(key).and_then(|r| self.tree.rows().get(r)) {
                Some(Row::Node(n)) => n,
                _ => return self.push_error("selection is gone; try again".to_string()),
            },
            None => return self.push_error(Error::NothingSelected.to_string()),
        };
        let request = match action.kind {
            InputKind::Commit => Action::Commit { message: value },
            InputKind::Amend => Action::Amend { message: value },
            InputKind::Shelve => Action::Shelve {
                name: Some(value).filter(|v| !v.is_empty()),
            },
            InputKind::SetPhase => match value.parse() {
                Ok(phase) => Action::PhaseSet(phase),
                Err(msg) => return self.push_error(msg),
            },
        };
        self.cursor = self.tree.rows().row_of(node);
        self.request(request);
    }

    /// Short description of a node for confirmation prompts.
    fn describe(&self, node: NodeId) -> Vec<String> {
        let mut lines = Vec::new();
        let top = self.tree.top_level(node);
        if top != node {
            if let Some(e) = self.tree.entity(top) {
                lines.extend(e.row_lines());
            }
        }
        if let Some(e) = self.tree.entity(node) {
            lines.extend(e.row_lines());
        }
        lines
    }

    pub(super) fn show_help(&mut self) {
        let lines = HELP
            .iter()
            .map(|(keys, what)| format!("{: <16}{}", keys, what))
            .collect();
        self.open_modal("Keys", lines);
    }

    pub(super) fn show_details(&mut self) {
        let Some(node) = self.selected_node() else {
            return;
        };
        let top = self.tree.top_level(node);
        let Some(cs) = self.tree.changeset(top) else {
            return self.push_error("select a changeset".to_string());
        };
        if cs.is_pending() {
            return self.push_output(vec!["working copy, not committed".to_string()]);
        }

        let mut lines = Vec::new();
        let rev = cs.rev.clone().unwrap_or_default();
        lines.push(format!("changeset  {}", rev));
        if let Some(user) = cs.user() {
            lines.push(format!("user       {}", user));
        }
        if let Some(date) = cs.date() {
            lines.push(format!("date       {}", fmt_changeset_date(date, OffsetDateTime::now_utc())));
        }
        if let Some(branch) = cs.branch() {
            lines.push(format!("branch     {}", branch));
        }
        if let Some(phase) = cs.phase() {
            lines.push(format!("phase      {}", phase));
        }
        if !cs.tags.is_empty() {
            lines.push(format!("tags       {}", cs.tags.join(", ")));
        }
        if !cs.bookmarks().is_empty() {
            lines.push(format!("bookmarks  {}", cs.bookmarks().join(", ")));
        }
        let history = self.tree.history();
        let revs = |idx: &[usize]| {
            idx.iter()
                .filter_map(|&i| history.get(i))
                .filter_map(|&id| self.tree.changeset(id))
                .filter_map(|c| c.rev.clone())
                .collect::<Vec<_>>()
                .join(" ")
        };
        lines.push(format!("parents    {}", revs(&cs.parent_revs)));
        lines.push(format!("children   {}", revs(&cs.child_revs)));
        lines.push(String::new());
        lines.push(cs.summary.clone());
        self.open_modal(format!("Changeset {}", rev), lines);
    }
}
