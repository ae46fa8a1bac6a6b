use crossterm::event::KeyEvent;

use self::keymap::{ModalAction, map_modal_key};

mod draw;
mod keymap;

pub(super) use self::draw::draw_modal;

pub(super) fn handle_modal_key(app: &mut super::App, key: KeyEvent) {
    let action = {
        let Some(m) = app.modal_mut() else {
            return;
        };
        map_modal_key(m, key)
    };

    match action {
        ModalAction::None => {}
        ModalAction::Close => {
            app.close_modal();
        }

        ModalAction::Confirm(action) => {
            app.close_modal();
            // Confirmed actions should not re-prompt.
            app.execute_action_confirmed(action);
        }

        ModalAction::SubmitTextInput { action, value } => {
            app.close_modal();
            app.submit_text_input(action, value);
        }
    }
}
