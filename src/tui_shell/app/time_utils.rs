use std::sync::OnceLock;

use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;

use super::*;

fn ts_ui_format() -> &'static [FormatItem<'static>] {
    static FMT: OnceLock<Vec<FormatItem<'static>>> = OnceLock::new();
    FMT.get_or_init(|| {
        time::format_description::parse("[hour padding:zero]:[minute padding:zero]:[second padding:zero]")
            .unwrap_or_default()
    })
}

/// `{date|isodate}` as printed by the log template, e.g. `2021-01-01 12:30 +0100`.
fn isodate_format() -> &'static [FormatItem<'static>] {
    static FMT: OnceLock<Vec<FormatItem<'static>>> = OnceLock::new();
    FMT.get_or_init(|| {
        time::format_description::parse(
            "[year]-[month]-[day] [hour]:[minute] [offset_hour sign:mandatory][offset_minute]",
        )
        .unwrap_or_default()
    })
}

fn fmt_since(dt: OffsetDateTime, now: OffsetDateTime) -> Option<String> {
    let secs = (now - dt).whole_seconds();

    // Future timestamps are rare; show as absolute.
    if secs < 0 {
        return None;
    }

    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    let s = if secs < 60 {
        "just now".to_string()
    } else if mins < 60 {
        format!("{}m ago", mins)
    } else if hours < 48 {
        format!("{}h ago", hours)
    } else if days < 60 {
        format!("{}d ago", days)
    } else {
        return None;
    };
    Some(s)
}

/// Changeset date with its age, or the raw text if it does not parse.
pub(in crate::tui_shell) fn fmt_changeset_date(raw: &str, now: OffsetDateTime) -> String {
    let Ok(dt) = OffsetDateTime::parse(raw.trim(), isodate_format()) else {
        return raw.to_string();
    };
    match fmt_since(dt, now) {
        Some(age) => format!("{} ({})", raw.trim(), age),
        None => raw.trim().to_string(),
    }
}

pub(in crate::tui_shell) fn fmt_ts_ui(ts: &str) -> String {
    OffsetDateTime::parse(ts, &Rfc3339)
        .ok()
        .and_then(|dt| dt.format(ts_ui_format()).ok())
        .unwrap_or_else(|| ts.to_string())
}

pub(in crate::tui_shell) fn now_ts() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "<time>".to_string())
}
