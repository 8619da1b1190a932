//! Terminal rendering of command results.
//!
//! Every function returns a `String` so output can be tested without a
//! terminal; `commands.rs` decides where it is printed.

use chrono::{DateTime, Utc};
use console::Style;
use marginapp::commands::{CmdMessage, MessageLevel};
use marginapp::merge::MergeReport;
use marginapp::model::{ExpositionSummary, Suggestion, Weave};
use marginapp::view::TextOnlyListing;
use std::fmt::Write;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const EXCERPT_WIDTH: usize = 72;
const SHORT_ID_LEN: usize = 8;

struct Styles {
    title: Style,
    muted: Style,
    selected: Style,
    suggestion: Style,
    id: Style,
}

fn styles() -> Styles {
    Styles {
        title: Style::new().bold(),
        muted: Style::new().dim(),
        selected: Style::new().black().on_yellow(),
        suggestion: Style::new().green(),
        id: Style::new().yellow(),
    }
}

pub fn render_messages(messages: &[CmdMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let style = match message.level {
            MessageLevel::Info => Style::new().dim(),
            MessageLevel::Success => Style::new().green(),
            MessageLevel::Warning => Style::new().yellow(),
            MessageLevel::Error => Style::new().red(),
        };
        let _ = writeln!(out, "{}", style.apply_to(&message.content));
    }
    out
}

/// Summary of a weave after a scan.
pub fn render_weave(weave: &Weave) -> String {
    let s = styles();
    let mut out = String::new();
    let title = if weave.page_title.is_empty() {
        weave.weave_id.as_str()
    } else {
        weave.page_title.as_str()
    };
    let _ = writeln!(
        out,
        "{} {}",
        s.title.apply_to(title),
        s.muted.apply_to(format!("(weave {})", weave.weave_id))
    );
    for tool in &weave.tools {
        let count = if tool.suggestion_count > 0 {
            s.suggestion
                .apply_to(format!("{} suggestion(s)", tool.suggestion_count))
                .to_string()
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "  {} {} {}",
            s.id.apply_to(pad_to_width(&tool.id, 24)),
            s.muted.apply_to(pad_to_width(&tool.tool_type, 14)),
            count
        );
    }
    let _ = writeln!(
        out,
        "{}",
        s.muted.apply_to(format!(
            "{} tool(s), {} suggestion(s)",
            weave.tool_count, weave.suggestion_count
        ))
    );
    out
}

/// Suggestions grouped by weave and tool, in the order given.
pub fn render_suggestions(suggestions: &[Suggestion]) -> String {
    let s = styles();
    let mut out = String::new();
    let mut current: Option<(&str, &str)> = None;

    for suggestion in suggestions {
        let group = (suggestion.weave_id.as_str(), suggestion.tool_id.as_str());
        if current != Some(group) {
            let _ = writeln!(
                out,
                "{}",
                s.title
                    .apply_to(format!("weave {} / {}", group.0, group.1))
            );
            current = Some(group);
        }

        let id: String = suggestion.id.chars().take(SHORT_ID_LEN).collect();
        let _ = writeln!(
            out,
            "  {} {} → {} {}",
            s.id.apply_to(id),
            s.selected
                .apply_to(truncate_to_width(&suggestion.selected_text, EXCERPT_WIDTH / 2)),
            s.suggestion
                .apply_to(truncate_to_width(&suggestion.suggestion_text, EXCERPT_WIDTH / 2)),
            s.muted.apply_to(format_time_ago(suggestion.timestamp))
        );
    }
    out
}

/// The text-only reading view.
pub fn render_listing(listing: &TextOnlyListing) -> String {
    let s = styles();
    let mut out = String::new();
    for (i, item) in listing.items.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let heading = if item.title.is_empty() {
            item.tool_id.as_str()
        } else {
            item.title.as_str()
        };
        let marker = if item.suggestion_count > 0 {
            format!(" [{}]", item.suggestion_count)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "{}{}",
            s.title.apply_to(heading),
            s.suggestion.apply_to(marker)
        );
        let _ = writeln!(out, "{}", wrap(&item.plain_text, LINE_WIDTH));
    }
    out
}

pub fn render_status(expositions: &[ExpositionSummary]) -> String {
    let s = styles();
    if expositions.is_empty() {
        return format!("{}\n", s.muted.apply_to("No expositions stored."));
    }
    let mut out = String::new();
    for summary in expositions {
        let _ = writeln!(
            out,
            "{} {:>4} weave(s) {:>5} tool(s) {:>5} suggestion(s)  {}",
            s.id.apply_to(pad_to_width(&summary.exposition_id, 16)),
            summary.weave_count,
            summary.tool_count,
            summary.suggestion_count,
            s.muted.apply_to(format_time_ago(summary.last_updated))
        );
    }
    out
}

pub fn render_merge(report: &MergeReport) -> String {
    let s = styles();
    format!(
        "{}\n  weaves created:     {}\n  tools inserted:     {}\n  suggestions added:  {}\n  duplicates skipped: {}\n",
        s.title
            .apply_to(format!("Merged into exposition {}", report.exposition_id)),
        report.weaves_created,
        report.tools_inserted,
        report.suggestions_added,
        report.duplicates_skipped
    )
}

fn pad_to_width(text: &str, width: usize) -> String {
    let text = truncate_to_width(text, width);
    let pad = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(pad))
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);
    for c in text.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

fn wrap(text: &str, width: usize) -> String {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.width() + 1 + word.width() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = timeago::Formatter::new();
    formatter.convert(duration.to_std().unwrap_or_default())
}
