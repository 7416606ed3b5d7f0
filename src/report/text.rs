use super::types::{AgingBucket, Report, ReportRecord};

const SUMMARY_WIDTH: usize = 100;
const TEAM_WIDTH: usize = 18;
const LINK_SUMMARY_CHARS: usize = 60;

/// Column widths of the main table (content only, without padding).
const MAIN_COLUMNS: [(&str, usize); 8] = [
    ("#", 2),
    ("Ticket ID", 11),
    ("Days Open", 9),
    ("Last Update", 11),
    ("Status", 8),
    ("Priority", 8),
    ("Teams", TEAM_WIDTH),
    ("Assignee", 14),
];

const SUMMARY_COLUMNS: [(&str, usize); 3] = [
    ("#", 2),
    ("Ticket ID", 11),
    ("AI-Generated Comment Summary", SUMMARY_WIDTH),
];

/// Render the human-readable report.
///
/// Sections, in order: main table, comment summaries, links, statistics.
/// Every section is present even when the report has no records.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("🐛 JIRA BUG SUMMARY REPORT\n");
    out.push_str(&format!(
        "Report generated on {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    render_main_table(&mut out, &report.records);
    out.push('\n');
    render_summary_table(&mut out, &report.records);
    out.push('\n');
    render_links(&mut out, &report.records);
    out.push('\n');
    render_statistics(&mut out, report);
    out
}

fn render_main_table(out: &mut String, records: &[ReportRecord]) {
    let widths: Vec<usize> = MAIN_COLUMNS.iter().map(|(_, w)| *w).collect();
    out.push_str(&border('┌', '┬', '┐', &widths));
    out.push_str(&row(&MAIN_COLUMNS.map(|(name, w)| fit(name, w))));
    out.push_str(&border('├', '┼', '┤', &widths));

    for (idx, record) in records.iter().enumerate() {
        let last_update = record
            .last_updated
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let days = format!("{} {:>3}", record.aging.bucket.indicator(), record.aging.days_open);
        let assignee = record
            .assignee
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("Unassigned");

        let cells = [
            format!("{:>2}", idx + 1),
            record.bug_key.clone(),
            days,
            last_update,
            record.status.clone(),
            record.priority.clone(),
            clip(&record.team.display(), TEAM_WIDTH),
            assignee.to_string(),
        ];
        let cells: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| fit(cell, *w))
            .collect();
        out.push_str(&row(&cells));
    }
    out.push_str(&border('└', '┴', '┘', &widths));
}

fn render_summary_table(out: &mut String, records: &[ReportRecord]) {
    let widths: Vec<usize> = SUMMARY_COLUMNS.iter().map(|(_, w)| *w).collect();
    out.push_str("💬 COMMENT SUMMARIES\n");
    out.push_str(&border('┌', '┬', '┐', &widths));
    out.push_str(&row(&SUMMARY_COLUMNS.map(|(name, w)| fit(name, w))));
    out.push_str(&border('├', '┼', '┤', &widths));

    for (idx, record) in records.iter().enumerate() {
        let mut lines = wrap(record.comments.narrative.as_str(), SUMMARY_WIDTH);
        if lines.is_empty() {
            lines.push("No summary available".to_string());
        }

        for (line_no, line) in lines.iter().enumerate() {
            let (num, key) = if line_no == 0 {
                (format!("{:>2}", idx + 1), record.bug_key.as_str())
            } else {
                (String::new(), "")
            };
            out.push_str(&row(&[
                fit(&num, widths[0]),
                fit(key, widths[1]),
                fit(line, widths[2]),
            ]));
        }

        if idx + 1 < records.len() {
            out.push_str(&border('├', '┼', '┤', &widths));
        }
    }
    out.push_str(&border('└', '┴', '┘', &widths));
}

fn render_links(out: &mut String, records: &[ReportRecord]) {
    out.push_str("🔗 LINKS TO TICKETS\n");
    if records.is_empty() {
        out.push_str("  (no tickets)\n");
    }
    for (idx, record) in records.iter().enumerate() {
        let summary = if record.summary.chars().count() > LINK_SUMMARY_CHARS {
            format!("{}...", record.summary.chars().take(LINK_SUMMARY_CHARS).collect::<String>())
        } else {
            record.summary.clone()
        };
        out.push_str(&format!(
            "  {}. <{}|{}> - {}\n",
            idx + 1,
            record.bug_url,
            record.bug_key,
            summary
        ));
    }
}

fn render_statistics(out: &mut String, report: &Report) {
    let rule = "━".repeat(60);
    out.push_str("📊 STATISTICS\n");
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("  • Total Bugs: {}\n", report.statistics.total));
    for bucket in AgingBucket::ALL {
        out.push_str(&format!(
            "  • {} {} ({}): {}\n",
            bucket.indicator(),
            bucket,
            bucket.range_label(),
            report.statistics.count(bucket)
        ));
    }
    out.push_str(&rule);
    out.push('\n');
}

fn border(left: char, mid: char, right: char, widths: &[usize]) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}\n", segments.join(&mid.to_string()))
}

fn row(cells: &[String]) -> String {
    format!("│ {} │\n", cells.join(" │ "))
}

/// Truncate to `width` characters and pad with spaces to exactly `width`.
fn fit(text: &str, width: usize) -> String {
    let clipped: String = text.chars().take(width).collect();
    let pad = width - clipped.chars().count();
    format!("{clipped}{}", " ".repeat(pad))
}

/// Shorten to at most `width` characters, marking the cut with "...".
fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

/// Greedy word wrap that keeps the text's own line breaks.
/// Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: String = word.to_string();
            while word.chars().count() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let head: String = word.chars().take(width).collect();
                word = word.chars().skip(width).collect();
                lines.push(head);
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}
