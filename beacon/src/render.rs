//! Text rendering of session state for the terminal.

use std::fmt::Write;

use beacon_client::{AccessToken, EventKind, Level, TokenSource};
use beacon_dispatch::{Dispatch, EventHistory, EventRecord, StatusClass, Toggle};
use chrono::Local;
use console::{Style, measure_text_width, pad_str, style};

const HEADERS: [&str; 4] = ["Event", "Item UUID", "Status", "Timestamp"];

fn status_style(class: StatusClass) -> Style {
    match class {
        StatusClass::Success => Style::new().green(),
        StatusClass::Failure => Style::new().red(),
        StatusClass::Neutral => Style::new().dim(),
    }
}

fn kind_style(kind: EventKind) -> Style {
    match kind {
        EventKind::Exception => Style::new().red().bold(),
        EventKind::Log(level) => match level {
            Level::Critical | Level::Error => Style::new().red(),
            Level::Warning => Style::new().yellow(),
            Level::Info => Style::new().cyan(),
            Level::Debug => Style::new().dim(),
        },
    }
}

fn cells(record: &EventRecord) -> [String; 4] {
    [
        record.level().to_string(),
        record.remote_id().unwrap_or("-").to_owned(),
        record.status().to_string(),
        record
            .timestamp()
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string(),
    ]
}

/// Renders the history as a table, newest first.
pub fn history_table(history: &EventHistory) -> String {
    if history.is_empty() {
        return style("No events sent yet.").dim().to_string();
    }

    let rows: Vec<_> = history.iter().map(|r| (r, cells(r))).collect();

    let mut widths = HEADERS.map(measure_text_width);
    for (_, cells) in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(measure_text_width(cell));
        }
    }

    let mut out = String::new();
    let header: Vec<_> = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| style(pad_str(h, w, console::Alignment::Left, None)).bold().to_string())
        .collect();
    writeln!(out, "{}", header.join("  ").trim_end()).ok();

    for (record, cells) in rows {
        let styles = [
            kind_style(record.level()),
            Style::new(),
            status_style(record.status_class()),
            Style::new().dim(),
        ];

        let line: Vec<_> = cells
            .iter()
            .zip(widths)
            .zip(styles)
            .map(|((cell, w), s)| {
                s.apply_to(pad_str(cell, w, console::Alignment::Left, None))
                    .to_string()
            })
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end()).ok();
    }

    out.truncate(out.trim_end().len());
    out
}

/// Renders the result of a dispatch.
///
/// `notice` is the currently posted notice, shown for blocked dispatches.
pub fn dispatch(kind: EventKind, dispatch: &Dispatch, notice: Option<&str>) -> String {
    match dispatch {
        Dispatch::Recorded(record) => {
            let status = status_style(record.status_class()).apply_to(record.status());
            format!(
                "sent {}: status {status}, item {}",
                kind_style(kind).apply_to(kind),
                record.remote_id().unwrap_or("-"),
            )
        }
        Dispatch::Blocked => {
            let message = notice.unwrap_or(beacon_dispatch::MISSING_TOKEN_NOTICE);
            style(message).yellow().to_string()
        }
        Dispatch::Busy => style(format!("dropped {kind}: another event is still being sent"))
            .yellow()
            .to_string(),
        Dispatch::Failed => style(format!("failed to send {kind}, see the log for details"))
            .red()
            .to_string(),
    }
}

/// Renders the result of flipping the recording switch.
pub fn toggle(toggle: Toggle, notice: Option<&str>) -> String {
    let state = |active: bool| if active { "on" } else { "off" };
    match toggle {
        Toggle::Blocked => {
            let message = notice.unwrap_or(beacon_dispatch::MISSING_TOKEN_NOTICE);
            style(message).yellow().to_string()
        }
        Toggle::Applied { active } => format!("session recording {}", style(state(active)).bold()),
        Toggle::Reinitialized { active } => format!(
            "session recording {} (monitoring client reinitialized)",
            style(state(active)).bold()
        ),
        Toggle::Failed => style("failed to change session recording, see the log for details")
            .red()
            .to_string(),
    }
}

/// Renders the active token, masked.
pub fn token(current: Option<&(AccessToken, TokenSource)>) -> String {
    match current {
        Some((token, source)) => format!("access token: {} ({source})", token.masked()),
        None => format!(
            "access token: -\n{}",
            style("No access token configured. Save one with `token set <token>`.").yellow()
        ),
    }
}
