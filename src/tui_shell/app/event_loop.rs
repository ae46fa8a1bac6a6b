use super::*;

pub(super) fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        while let Some(msg) = app.jobs.try_recv() {
            app.apply(msg);
        }

        terminal
            .draw(|f| super::render::draw(f, app))
            .context("draw")?;
        if app.quit {
            return Ok(());
        }

        if event::poll(Duration::from_millis(50)).context("poll")? {
            match event::read().context("read event")? {
                Event::Key(k) if k.kind == KeyEventKind::Press => handle_key(app, k),
                _ => {}
            }
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if app.modal.is_some() {
        modal::handle_modal_key(app, key);
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('c') {
            app.quit = true;
        }
        return;
    }

    if let KeyCode::Char(c) = key.code {
        if let Some(d) = c.to_digit(10) {
            app.push_count_digit(d);
            return;
        }
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit = true;
        }

        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(true),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(false),
        KeyCode::Home => app.move_to_edge(false),
        KeyCode::End => app.move_to_edge(true),

        KeyCode::Enter | KeyCode::Tab => app.toggle_selected(false),
        KeyCode::Char('r') => app.toggle_selected(true),

        KeyCode::Char('h') | KeyCode::Left => app.navigate(nav::up),
        KeyCode::Char('l') | KeyCode::Right => app.navigate(nav::down),
        KeyCode::Char('J') => {
            let n = app.take_count();
            app.navigate(|t, r| nav::next_same_level(t, r, n));
        }
        KeyCode::Char('K') => {
            let n = app.take_count();
            app.navigate(|t, r| nav::prev_same_level(t, r, n));
        }

        KeyCode::Char('g') => {
            app.refresh();
            app.push_output(vec!["refreshing".to_string()]);
        }
        KeyCode::Char('i') => app.show_details(),
        KeyCode::Char('?') => app.show_help(),

        KeyCode::Char('u') => app.request(Action::Update),
        KeyCode::Char('R') => app.request(Action::Revert),
        KeyCode::Char('c') => app.open_input(InputKind::Commit),
        KeyCode::Char('a') => app.open_input(InputKind::Amend),
        KeyCode::Char('D') => app.request(Action::Duplicate),
        KeyCode::Char('U') => app.request(Action::Uncommit),
        KeyCode::Char('s') => app.open_input(InputKind::Shelve),
        KeyCode::Char('S') => app.request(Action::Unshelve),
        KeyCode::Char('x') => app.request(Action::DeleteShelve),
        KeyCode::Char('X') => app.request(Action::Strip),
        KeyCode::Char('p') => app.request(Action::PhaseGet),
        KeyCode::Char('P') => app.open_input(InputKind::SetPhase),

        _ => {}
    }

    // A count only applies to the key right after it.
    if !matches!(key.code, KeyCode::Char('J') | KeyCode::Char('K')) {
        app.count = None;
    }
}
