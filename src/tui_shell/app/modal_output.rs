use super::*;

impl App {
    fn push_status(&mut self, kind: StatusKind, lines: Vec<String>) {
        match kind {
            StatusKind::Error => tracing::warn!(message = %lines.join(" | "), "ui error"),
            StatusKind::Output | StatusKind::Notice => tracing::debug!(message = %lines.join(" | "), "ui output"),
        }
        self.status = Some(StatusLine {
            ts: now_ts(),
            kind,
            lines,
        });
    }

    pub(in crate::tui_shell) fn push_output(&mut self, lines: Vec<String>) {
        self.push_status(StatusKind::Output, lines);
    }

    pub(in crate::tui_shell) fn push_notice(&mut self, msg: String) {
        self.push_status(StatusKind::Notice, vec![msg]);
    }

    pub(in crate::tui_shell) fn push_error(&mut self, msg: String) {
        self.push_status(StatusKind::Error, vec![msg]);
    }

    pub(super) fn open_modal(&mut self, title: impl Into<String>, lines: Vec<String>) {
        self.modal = Some(Modal {
            title: title.into(),
            lines,
            scroll: 0,
            kind: ModalKind::Viewer,
            input: Input::default(),
        });
    }

    pub(super) fn open_confirm_modal(&mut self, action: PendingAction, mut lines: Vec<String>) {
        lines.push("".to_string());
        lines.push("Enter to run; Esc to cancel.".to_string());
        self.modal = Some(Modal {
            title: format!("Confirm {}", action.label),
            lines,
            scroll: 0,
            kind: ModalKind::ConfirmAction { action },
            input: Input::default(),
        });
    }

    pub(super) fn open_text_input_modal(
        &mut self,
        title: impl Into<String>,
        prompt: impl Into<String>,
        action: TextInputAction,
        initial: Option<String>,
        mut lines: Vec<String>,
    ) {
        lines.push("".to_string());
        lines.push("Enter to save; Esc to cancel.".to_string());

        let mut input = Input::default();
        if let Some(s) = initial {
            input.set(s);
        }

        self.modal = Some(Modal {
            title: title.into(),
            lines,
            scroll: 0,
            kind: ModalKind::TextInput {
                action,
                prompt: prompt.into(),
            },
            input,
        });
    }

    pub(in crate::tui_shell) fn modal_mut(&mut self) -> Option<&mut Modal> {
        self.modal.as_mut()
    }

    pub(in crate::tui_shell) fn close_modal(&mut self) {
        self.modal = None;
    }
}
