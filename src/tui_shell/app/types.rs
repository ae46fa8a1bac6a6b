use crate::actions::Plan;
use crate::tree::NodeKey;

use super::Input;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::tui_shell) enum StatusKind {
    Output,
    // Dead ends and waits; nothing went wrong.
    Notice,
    Error,
}

#[derive(Clone, Debug)]
pub(in crate::tui_shell) struct StatusLine {
    pub(in crate::tui_shell) ts: String,
    pub(in crate::tui_shell) kind: StatusKind,
    pub(in crate::tui_shell) lines: Vec<String>,
}

/// A planned mutation waiting for confirmation.
#[derive(Clone, Debug)]
pub(in crate::tui_shell) struct PendingAction {
    pub(in crate::tui_shell) label: String,
    pub(in crate::tui_shell) plan: Plan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::tui_shell) enum InputKind {
    Commit,
    Amend,
    Shelve,
    SetPhase,
}

/// Text input bound to the node that was selected when it opened.
#[derive(Clone, Debug)]
pub(in crate::tui_shell) struct TextInputAction {
    pub(in crate::tui_shell) kind: InputKind,
    pub(in crate::tui_shell) target: Option<NodeKey>,
}

pub(in crate::tui_shell) enum ModalKind {
    Viewer,
    ConfirmAction {
        action: PendingAction,
    },
    TextInput {
        action: TextInputAction,
        prompt: String,
    },
}

pub(in crate::tui_shell) struct Modal {
    pub(in crate::tui_shell) kind: ModalKind,
    pub(in crate::tui_shell) title: String,
    pub(in crate::tui_shell) lines: Vec<String>,
    pub(in crate::tui_shell) scroll: usize,
    pub(in crate::tui_shell) input: Input,
}
