use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use time::OffsetDateTime;

use crate::actions::{self, Action};
use crate::error::Error;
use crate::model::{Entity, NodeId};
use crate::nav;
use crate::tree::{Expansion, Row, RowId, TreeEngine};
use crate::vcs::Vcs;

use super::input::Input;
use super::modal;

mod event_loop;
mod jobs;
mod modal_output;
mod render;
mod runtime;
mod time_utils;
mod tree_actions;
mod types;

use self::jobs::{JobMsg, Jobs};
use self::time_utils::{fmt_changeset_date, fmt_ts_ui, now_ts};
pub(super) use self::types::{InputKind, Modal, ModalKind, PendingAction, TextInputAction};
use self::types::{StatusKind, StatusLine};

pub(super) fn run(opts: crate::tui::TuiRunOptions) -> Result<()> {
    runtime::run(opts)
}

pub(super) struct App {
    root: PathBuf,
    revset: String,
    vcs: Vcs,
    jobs: Jobs,

    tree: TreeEngine,
    cursor: Option<RowId>,
    // Digits typed before J/K.
    count: Option<usize>,

    // Labels of command rounds still running.
    busy: Vec<String>,
    status: Option<StatusLine>,
    loaded: bool,

    modal: Option<Modal>,

    quit: bool,
}

impl App {
    fn load(opts: crate::tui::TuiRunOptions) -> Result<Self> {
        let vcs = Vcs::new(&opts.config);
        let jobs = Jobs::new(opts.repo_root.clone(), vcs.clone())?;
        let mut app = Self {
            root: opts.repo_root,
            revset: opts.config.revset.clone(),
            vcs,
            jobs,
            tree: TreeEngine::new(),
            cursor: None,
            count: None,
            busy: Vec::new(),
            status: None,
            loaded: false,
            modal: None,
            quit: false,
        };
        app.refresh();
        Ok(app)
    }

    fn selected_node(&self) -> Option<NodeId> {
        self.cursor
            .and_then(|r| self.tree.rows().get(r))
            .and_then(Row::node)
    }

    /// Puts the cursor back on a node row after rows went away.
    fn ensure_cursor(&mut self) {
        if self.selected_node().is_some() {
            return;
        }
        self.cursor = self
            .tree
            .rows()
            .iter()
            .find(|(_, r)| r.node().is_some())
            .map(|(id, _)| id);
    }

    fn refresh(&mut self) {
        let plan = self.tree.begin_refresh();
        self.jobs.refresh(plan);
    }

    /// Applies one finished background job. Runs on the UI thread only.
    fn apply(&mut self, msg: JobMsg) {
        match msg {
            JobMsg::Started(label) => self.busy.push(label),
            JobMsg::Finished(label) => {
                if let Some(i) = self.busy.iter().position(|l| *l == label) {
                    self.busy.remove(i);
                }
            }
            JobMsg::Refreshed { plan, result } => {
                let outputs = match result {
                    Ok(o) => o,
                    Err(err) => return self.push_error(format!("refresh: {}", err)),
                };
                let key = self.selected_node().and_then(|n| self.tree.key(n));
                let position = self.cursor.and_then(|r| self.tree.rows().position(r));
                match self.tree.finish_refresh(plan, outputs) {
                    Ok(true) => {
                        self.loaded = true;
                        self.cursor = key
                            .and_then(|k| self.tree.locate(&k))
                            .or_else(|| {
                                let last = self.tree.rows().len().saturating_sub(1);
                                position.and_then(|p| self.tree.rows().nth(p.min(last)))
                            });
                        self.ensure_cursor();
                    }
                    Ok(false) => {}
                    Err(err) => self.push_error(format!("refresh: {}", err)),
                }
            }
            JobMsg::Expanded { plan, result } => {
                let node = plan.node;
                let label = plan.fetch.label();
                match result {
                    Ok(outputs) => {
                        if self.tree.finish_expand(plan, outputs) && self.selected_node().is_none() {
                            self.cursor = self.tree.rows().row_of(node);
                        }
                        self.ensure_cursor();
                    }
                    Err(err) => {
                        self.tree.abandon_expand(&plan);
                        self.push_error(format!("{}: {}", label, err));
                    }
                }
            }
            JobMsg::Mutated {
                label,
                refresh,
                result,
            } => {
                match result {
                    Ok(output) => {
                        let lines: Vec<String> = output
                            .lines()
                            .map(str::trim_end)
                            .filter(|l| !l.is_empty())
                            .map(str::to_string)
                            .collect();
                        if lines.is_empty() {
                            self.push_output(vec![format!("{}: done", label)]);
                        } else {
                            self.push_output(lines);
                        }
                    }
                    Err(err) => self.push_error(format!("{}: {}", label, err)),
                }
                if refresh {
                    self.refresh();
                }
            }
        }
    }
}
