use super::*;

pub(super) fn draw(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(area);

    // Header
    let mut spans = vec![
        Span::styled("hgtree", Style::default().fg(Color::Black).bg(Color::White)),
        Span::raw("  "),
        Span::raw(app.root.display().to_string()),
        Span::raw("  "),
        Span::styled(app.revset.as_str(), Style::default().fg(Color::Gray)),
    ];
    if !app.busy.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("running: {}", app.busy.join(", ")),
            Style::default().fg(Color::Yellow),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    draw_tree(frame, chunks[1], app);

    // Status / last result
    {
        let mut lines = Vec::new();
        if let Some(s) = &app.status {
            let style = match s.kind {
                StatusKind::Output => Style::default().fg(Color::White),
                StatusKind::Notice => Style::default().fg(Color::Gray),
                StatusKind::Error => Style::default().fg(Color::Red),
            };
            for (i, l) in s.lines.iter().enumerate() {
                if i == 0 {
                    lines.push(Line::from(vec![
                        Span::styled(format!("{} ", fmt_ts_ui(&s.ts)), Style::default().fg(Color::Gray)),
                        Span::styled(l.as_str(), style),
                    ]));
                } else {
                    lines.push(Line::from(Span::styled(l.as_str(), style)));
                }
            }
        }
        if lines.is_empty() {
            lines.push(Line::from(""));
        }
        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(Block::default().borders(Borders::TOP).title("Last")),
            chunks[2],
        );
    }

    let mut hint = vec![Span::styled(
        "? keys  q quit",
        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
    )];
    if let Some(n) = app.count {
        hint.push(Span::raw("  "));
        hint.push(Span::styled(format!("count {}", n), Style::default().fg(Color::Cyan)));
    }
    frame.render_widget(Paragraph::new(Line::from(hint)), chunks[3]);

    if let Some(m) = &app.modal {
        dim_frame(frame);
        modal::draw_modal(frame, m);
    }
}

fn draw_tree(frame: &mut ratatui::Frame, area: ratatui::layout::Rect, app: &App) {
    let rows = app.tree.rows();
    if rows.is_empty() {
        let msg = if app.loaded { "(empty)" } else { "loading..." };
        frame.render_widget(Paragraph::new(msg).style(Style::default().fg(Color::Gray)), area);
        return;
    }

    let mut items = Vec::with_capacity(rows.len());
    let mut selected = None;
    for (i, (id, row)) in rows.iter().enumerate() {
        if Some(id) == app.cursor {
            selected = Some(i);
        }
        items.push(ListItem::new(row_lines(app, row, area.width)));
    }

    let mut state = ListState::default();
    state.select(selected);
    let list = List::new(items).highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, &mut state);
}

fn row_lines(app: &App, row: Row, width: u16) -> Vec<Line<'static>> {
    let id = match row {
        Row::Separator(section) => {
            let label = format!(" {} ", section.label());
            let rule = "─".repeat((width as usize).saturating_sub(label.len() + 2) / 2);
            return vec![Line::from(Span::styled(
                format!("{}{}{}", rule, label, rule),
                Style::default().fg(Color::DarkGray),
            ))];
        }
        Row::Node(id) => id,
    };
    let Some(node) = app.tree.node(id) else {
        return vec![Line::from("")];
    };
    let indent = "  ".repeat(app.tree.depth(id));
    let marker = match (node.entity.is_expandable(), node.expanded) {
        (false, _) => "",
        (true, true) => "▾ ",
        (true, false) => "▸ ",
    };

    match &node.entity {
        Entity::Changeset(cs) => {
            let mut spans = vec![Span::raw(indent), Span::raw(marker)];
            if let Some(title) = &cs.title {
                spans.push(Span::styled(title.clone(), Style::default().fg(Color::Yellow)));
                return vec![Line::from(spans)];
            }
            if cs.current {
                spans.push(Span::styled("@ ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
            } else {
                spans.push(Span::raw("o "));
            }
            spans.push(Span::styled(
                cs.rev.clone().unwrap_or_default(),
                Style::default().fg(Color::Cyan),
            ));
            for tag in &cs.tags {
                spans.push(Span::styled(format!(" [{}]", tag), Style::default().fg(Color::Green)));
            }
            for bookmark in cs.bookmarks() {
                spans.push(Span::styled(format!(" <{}>", bookmark), Style::default().fg(Color::Magenta)));
            }
            if let Some(branch) = cs.branch().filter(|b| *b != "default") {
                spans.push(Span::styled(format!(" ({})", branch), Style::default().fg(Color::Blue)));
            }
            let summary_style = match cs.phase() {
                Some("secret") => Style::default().fg(Color::Red),
                Some("public") => Style::default().fg(Color::Gray),
                _ => Style::default(),
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(cs.summary.clone(), summary_style));
            vec![Line::from(spans)]
        }
        Entity::File(f) => {
            let color = match f.status {
                'M' => Color::Yellow,
                'A' => Color::Green,
                'R' | '!' => Color::Red,
                '?' => Color::Magenta,
                _ => Color::White,
            };
            vec![Line::from(vec![
                Span::raw(indent),
                Span::raw(marker),
                Span::styled(f.status.to_string(), Style::default().fg(color)),
                Span::raw(" "),
                Span::raw(f.path.clone()),
            ])]
        }
        Entity::Hunk(h) => {
            let numbers = h.new_line_numbers();
            h.lines
                .iter()
                .zip(numbers)
                .map(|(line, n)| {
                    let style = if line.starts_with("@@") {
                        Style::default().fg(Color::Cyan)
                    } else if line.starts_with('+') {
                        Style::default().fg(Color::Green)
                    } else if line.starts_with('-') {
                        Style::default().fg(Color::Red)
                    } else {
                        Style::default()
                    };
                    let gutter = n.map(|n| format!("{: >5} ", n)).unwrap_or_else(|| "      ".to_string());
                    Line::from(vec![
                        Span::raw(indent.clone()),
                        Span::styled(gutter, Style::default().fg(Color::DarkGray)),
                        Span::styled(line.clone(), style),
                    ])
                })
                .collect()
        }
        Entity::Shelve(s) => vec![Line::from(vec![
            Span::raw(indent),
            Span::raw(marker),
            Span::styled(s.name.clone(), Style::default().fg(Color::Cyan)),
            Span::styled(format!(" ({})", s.age), Style::default().fg(Color::Gray)),
            Span::raw(" "),
            Span::raw(s.message.clone()),
        ])],
    }
}

fn dim_frame(frame: &mut ratatui::Frame) {
    let area = frame.area();
    let buf = frame.buffer_mut();
    for y in area.y..area.y.saturating_add(area.height) {
        for x in area.x..area.x.saturating_add(area.width) {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.modifier |= Modifier::DIM;
            }
        }
    }
}
