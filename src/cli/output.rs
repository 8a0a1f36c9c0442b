// Output formatting utilities

use crate::config::ColorMode;
use crate::models::{FlagEvent, FlagRecord, TaskStatus};
use crate::nav::NavigationRequest;
use crate::tracker::TrackerView;
use crate::tracker::derive::SETUP_STEPS;
use chrono::{Local, TimeZone};
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_CYAN: &str = "\x1b[36m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

const MAX_BAR_WIDTH: usize = 40;

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Resolve the configured colour mode against the current stdout
pub fn use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_tty() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate, with fallback to the COLUMNS
/// environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(80)
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("{}{}{}", code, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Done => ANSI_FG_GREEN,
        TaskStatus::InProgress => ANSI_FG_YELLOW,
        TaskStatus::NotStarted => ANSI_FG_BRIGHT_BLACK,
    }
}

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Done => "[x]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::NotStarted => "[ ]",
    }
}

/// Render a progress bar sized to the terminal
pub fn format_progress_bar(percent: u8, width: usize) -> String {
    let bar_width = width.saturating_sub(20).clamp(10, MAX_BAR_WIDTH);
    let filled = (bar_width * percent.min(100) as usize + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(bar_width - filled))
}

/// Format a timestamp for display (local time)
pub fn format_timestamp(ts: i64) -> String {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Task table: marker, id, status, title; the selected row is flagged with `>`
pub fn format_task_table(view: &TrackerView, color: bool) -> String {
    let mut output = String::new();
    let id_width = view.snapshot.tasks.iter().map(|p| p.task.id.len()).max().unwrap_or(2).max(4);

    // Row prefix is "> 1 [x] ": pointer, number, marker
    output.push_str(&format!(
        "  #     {:<w$}  {:<11}  {}\n",
        "Task",
        "Status",
        "Title",
        w = id_width
    ));
    for (idx, progress) in view.snapshot.tasks.iter().enumerate() {
        let pointer = if progress.task.id == view.selected { ">" } else { " " };
        let status = format!("{:<11}", progress.status.as_str());
        let line = format!(
            "{} {} {} {:<w$}  {}  {}",
            pointer,
            idx + 1,
            status_marker(progress.status),
            progress.task.id,
            paint(&status, status_color(progress.status), color),
            progress.task.title,
            w = id_width
        );
        if progress.task.id == view.selected {
            output.push_str(&paint(&line, ANSI_BOLD, color));
        } else {
            output.push_str(&line);
        }
        output.push('\n');
    }
    output
}

/// Dashboard shown by `ontrack status` and each `ontrack watch` update
pub fn format_status_dashboard(view: &TrackerView, color: bool, width: usize) -> String {
    let snapshot = &view.snapshot;
    let mut output = String::new();

    output.push_str("=== Onboarding Progress ===\n");
    output.push_str(&format!(
        "{} {}% ({} of {} tasks done)\n",
        format_progress_bar(snapshot.percent_complete, width),
        snapshot.percent_complete,
        snapshot.done_count,
        snapshot.tasks.len()
    ));
    output.push('\n');

    output.push_str("=== Set Up Basics ===\n");
    output.push_str(&format!("{} of {} steps\n", snapshot.setup.done, snapshot.setup.total));
    for (label, flag) in SETUP_STEPS {
        let status = if snapshot.flags.get(flag) { TaskStatus::Done } else { TaskStatus::NotStarted };
        output.push_str(&format!(
            "  {} {}\n",
            paint(status_marker(status), status_color(status), color),
            label
        ));
    }
    output.push('\n');

    output.push_str("=== Tasks ===\n");
    output.push_str(&format_task_table(view, color));
    output.push('\n');

    let selected = snapshot.tasks.iter().find(|p| p.task.id == view.selected);
    if let Some(progress) = selected {
        output.push_str(&format!(
            "Next: {} ({}){}\n",
            paint(progress.task.title, ANSI_FG_CYAN, color),
            progress.task.id,
            if view.manual { " [selected]" } else { "" }
        ));
        output.push_str(&format!("      {}\n", progress.task.description));
    }

    output
}

/// Raw flag listing
pub fn format_flag_list(records: &[FlagRecord], color: bool) -> String {
    if records.is_empty() {
        return "No flags set.\n".to_string();
    }
    let key_width = records.iter().map(|r| r.key.len()).max().unwrap_or(3).max(4);
    let mut output = format!("{:<w$}  {:<7}  {}\n", "Flag", "Value", "Modified", w = key_width);
    for record in records {
        let value = match record.value {
            Some(true) => paint("true   ", ANSI_FG_GREEN, color),
            Some(false) => "false  ".to_string(),
            None => paint("(unset)", ANSI_FG_BRIGHT_BLACK, color),
        };
        let modified = record.modified_ts.map(format_timestamp).unwrap_or_default();
        output.push_str(&format!("{:<w$}  {}  {}\n", record.key, value, modified, w = key_width));
    }
    output
}

/// Flag write history, oldest first
pub fn format_flag_history(events: &[FlagEvent]) -> String {
    if events.is_empty() {
        return "No flag history.\n".to_string();
    }
    let mut output = String::new();
    for event in events {
        let value = match event.value {
            Some(v) => format!("set {}", v),
            None => "removed".to_string(),
        };
        output.push_str(&format!("{}  {}  {}\n", format_timestamp(event.ts), event.key, value));
    }
    output
}

/// Navigation handoff for `ontrack start`
pub fn format_navigation(request: &NavigationRequest) -> String {
    let mut output = format!("Navigate to {} (task: {})\n", request.target, request.task_id);
    if let Some(state) = &request.state {
        if let Some(page) = &state.active_page {
            output.push_str(&format!("  activePage: {}\n", page));
        }
        if let Some(tab) = &state.active_tab {
            output.push_str(&format!("  activeTab: {}\n", tab));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlagSet;
    use crate::tracker::evaluate;

    fn view(flags: FlagSet) -> TrackerView {
        let snapshot = evaluate(flags);
        TrackerView {
            selected: snapshot.default_selection,
            snapshot,
            manual: false,
            changed: true,
        }
    }

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(format_progress_bar(0, 60), format!("[{}]", "-".repeat(40)));
        assert_eq!(format_progress_bar(100, 60), format!("[{}]", "#".repeat(40)));
        // Narrow terminals still get a usable bar
        assert_eq!(format_progress_bar(50, 5), "[#####-----]");
    }

    #[test]
    fn test_dashboard_plain() {
        let output = format_status_dashboard(&view(FlagSet::default()), false, 80);
        assert!(output.contains("14% (1 of 7 tasks done)"));
        assert!(output.contains("0 of 2 steps"));
        assert!(output.contains("Next: Set up your organization (organization)"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_dashboard_colored() {
        let output = format_status_dashboard(&view(FlagSet::new(true, false, false)), true, 80);
        assert!(output.contains(ANSI_FG_YELLOW));
        assert!(output.contains(ANSI_RESET));
    }

    #[test]
    fn test_task_table_marks_selection() {
        let output = format_task_table(&view(FlagSet::new(true, false, false)), false);
        let selected_line = output.lines().find(|l| l.starts_with('>')).unwrap();
        assert!(selected_line.contains("entity"));
        assert!(selected_line.contains("in-progress"));
    }

    #[test]
    fn test_task_table_header_aligned_with_rows() {
        let output = format_task_table(&view(FlagSet::default()), false);
        let mut lines = output.lines();
        let header = lines.next().unwrap();
        let first = lines.next().unwrap();

        assert_eq!(header.find('#'), first.find('1'));
        assert_eq!(header.find("Task"), first.find("account"));
        assert_eq!(header.find("Status"), first.find("done"));
        assert_eq!(header.find("Title"), first.find("Create your account"));
    }

    #[test]
    fn test_flag_list() {
        assert_eq!(format_flag_list(&[], false), "No flags set.\n");
        let records = vec![FlagRecord { key: "entityCreated".into(), value: None, modified_ts: None }];
        assert!(format_flag_list(&records, false).contains("(unset)"));
    }

    #[test]
    fn test_navigation() {
        let request = NavigationRequest::for_route(
            "workers",
            &crate::models::TaskRoute::sub_page("/people", "workers", Some("invite")),
        );
        let output = format_navigation(&request);
        assert!(output.contains("Navigate to /people?page=workers&tab=invite"));
        assert!(output.contains("activeTab: invite"));
    }
}
