use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::super::{InputKind, Modal, ModalKind, PendingAction, TextInputAction};
use crate::vcs::Phase;

pub(super) enum ModalAction {
    None,
    Close,
    Confirm(PendingAction),
    SubmitTextInput {
        action: TextInputAction,
        value: String,
    },
}

pub(super) fn map_modal_key(modal: &mut Modal, key: KeyEvent) -> ModalAction {
    match &mut modal.kind {
        ModalKind::Viewer => handle_viewer_like_key(modal, key),

        ModalKind::TextInput { action, .. } => match key.code {
            KeyCode::Esc => ModalAction::Close,
            KeyCode::Enter => {
                let raw = modal.input.buf.trim().to_string();
                match validate_text_input(action.kind, &raw) {
                    Ok(()) => ModalAction::SubmitTextInput {
                        action: action.clone(),
                        value: raw,
                    },
                    Err(msg) => {
                        append_modal_error(modal, msg);
                        ModalAction::None
                    }
                }
            }
            _ => {
                apply_input_edit_key(modal, key);
                ModalAction::None
            }
        },

        ModalKind::ConfirmAction { action } => match key.code {
            KeyCode::Esc | KeyCode::Char('n') => ModalAction::Close,
            KeyCode::Enter | KeyCode::Char('y') => ModalAction::Confirm(action.clone()),
            _ => handle_viewer_like_key(modal, key),
        },
    }
}

fn validate_text_input(kind: InputKind, raw: &str) -> Result<(), String> {
    match kind {
        InputKind::Shelve => Ok(()),
        InputKind::Commit | InputKind::Amend if raw.is_empty() => Err("message required".to_string()),
        InputKind::Commit | InputKind::Amend => Ok(()),
        InputKind::SetPhase => raw.parse::<Phase>().map(|_| ()),
    }
}

fn append_modal_error(modal: &mut Modal, msg: String) {
    // Replace a previous error rather than stacking them.
    if modal.lines.last().is_some_and(|l| l.starts_with("error: ")) {
        modal.lines.pop();
    }
    modal.lines.push(format!("error: {}", msg));
}

fn handle_viewer_like_key(modal: &mut Modal, key: KeyEvent) -> ModalAction {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => ModalAction::Close,
        KeyCode::Up | KeyCode::Char('k') => {
            modal.scroll = modal.scroll.saturating_sub(1);
            ModalAction::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if modal.scroll < modal.lines.len().saturating_sub(1) {
                modal.scroll += 1;
            }
            ModalAction::None
        }
        KeyCode::PageUp => {
            modal.scroll = modal.scroll.saturating_sub(10);
            ModalAction::None
        }
        KeyCode::PageDown => {
            modal.scroll = (modal.scroll + 10).min(modal.lines.len().saturating_sub(1));
            ModalAction::None
        }
        _ => ModalAction::None,
    }
}

fn apply_input_edit_key(modal: &mut Modal, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => modal.input.backspace(),
        KeyCode::Delete => modal.input.delete(),
        KeyCode::Left => modal.input.move_left(),
        KeyCode::Right => modal.input.move_right(),
        KeyCode::Home => modal.input.home(),
        KeyCode::End => modal.input.end(),
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT)
            {
                modal.input.insert_char(c);
            }
        }
        _ => {}
    }
}
