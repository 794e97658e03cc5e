use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::scoring::{AttributeTable, Classification, InputSource};

const CLOSE_CALL: &str = "Close call: this is a borderline/ambiguous classification.";
const MAX_BAR_WIDTH: usize = 40;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Bar width that fits the terminal next to the label and percentage columns.
/// Pipes get the full width.
fn bar_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) => (w as usize).saturating_sub(30).clamp(10, MAX_BAR_WIDTH),
        None => MAX_BAR_WIDTH,
    }
}

/// Format a percentage with one decimal place: "90.7%"
pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

/// Horizontal bar of `width` cells, filled in proportion to `percent`.
pub fn format_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Colorize by category position so every category keeps one color.
fn paint(text: &str, index: usize, use_colors: bool) -> String {
    if !use_colors {
        return text.to_string();
    }
    match index % 5 {
        0 => text.cyan().to_string(),
        1 => text.blue().to_string(),
        2 => text.bright_red().to_string(),
        3 => text.magenta().to_string(),
        _ => text.green().to_string(),
    }
}

/// One-line running tally: "soup 90.7% | salad 9.3% | sandwich 0.0%"
pub fn format_tally(result: &Classification, use_colors: bool) -> String {
    let parts: Vec<String> = result
        .scores
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let entry = format!("{} {}", s.category, format_percent(s.percent));
            if s.category == result.majority {
                if use_colors {
                    paint(&entry, i, true).bold().to_string()
                } else {
                    entry
                }
            } else {
                paint(&entry, i, use_colors)
            }
        })
        .collect();
    let tally = parts.join(" | ");
    if result.is_ambiguous {
        format!("{} (close call)", tally)
    } else {
        tally
    }
}

/// Explanation lines: scores, verdict, close-call warning and the inputs used.
pub fn format_explanation(result: &Classification) -> Vec<String> {
    let raw: Vec<String> = result
        .scores
        .iter()
        .map(|s| format!("{}: {:.4}", s.category, s.raw))
        .collect();
    let pct: Vec<String> = result
        .scores
        .iter()
        .map(|s| format!("{}: {}", s.category, format_percent(s.percent)))
        .collect();

    let mut lines = vec![
        format!("Raw scores: {}", raw.join(", ")),
        format!("Normalized percentages: {}", pct.join(", ")),
        format!(
            "Top: {} ({})",
            result.majority,
            format_percent(result.majority_percent)
        ),
    ];
    if result.degenerate {
        lines.push(
            "No attribute contributed any score; percentages are an even split.".to_string(),
        );
    }
    if result.is_ambiguous {
        lines.push(CLOSE_CALL.to_string());
    }
    let inputs: Vec<String> = result
        .resolved_inputs
        .iter()
        .map(|r| format!("{} = {}", r.attribute, r.describe()))
        .collect();
    lines.push(format!("Inputs: {}.", inputs.join("; ")));
    if !result.ignored_features.is_empty() {
        lines.push(format!("Ignored: {}.", result.ignored_features.join(", ")));
    }
    lines
}

/// Full report for one dish.
pub fn format_report(
    name: &str,
    result: &Classification,
    table: &AttributeTable,
    use_colors: bool,
) -> String {
    let width = bar_width();
    let label_width = result
        .scores
        .iter()
        .map(|s| s.category.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines = Vec::new();
    let verdict = format!(
        "Majority: {} ({})",
        result.majority,
        format_percent(result.majority_percent)
    );
    if use_colors {
        lines.push(name.bold().to_string());
        lines.push(verdict.bold().to_string());
    } else {
        lines.push(name.to_string());
        lines.push(verdict);
    }
    lines.push(String::new());

    for (i, score) in result.scores.iter().enumerate() {
        lines.push(format!(
            "  {:<lw$}  {}  {:>6}",
            score.category,
            paint(&format_bar(score.percent, width), i, use_colors),
            format_percent(score.percent),
            lw = label_width
        ));
    }

    if result.is_ambiguous {
        lines.push(String::new());
        if use_colors {
            lines.push(CLOSE_CALL.yellow().to_string());
        } else {
            lines.push(CLOSE_CALL.to_string());
        }
    }

    lines.push(String::new());
    lines.push("Inputs:".to_string());
    for input in &result.resolved_inputs {
        let label = table
            .attribute(&input.attribute)
            .map(|a| a.display_label())
            .unwrap_or(&input.attribute);
        let value = input.describe();
        let value = match (&input.source, use_colors) {
            (InputSource::Provided, _) | (_, false) => value,
            (InputSource::Defaulted, true) => value.dimmed().to_string(),
            (_, true) => value.yellow().to_string(),
        };
        lines.push(format!("  {}: {}", label, value));
    }
    if !result.ignored_features.is_empty() {
        lines.push(format!("  (ignored: {})", result.ignored_features.join(", ")));
    }

    lines.push(String::new());
    let raw: Vec<String> = result
        .scores
        .iter()
        .map(|s| format!("{}={:.4}", s.category, s.raw))
        .collect();
    let raw_line = format!("Raw scores: {}", raw.join(" "));
    if use_colors {
        lines.push(raw_line.dimmed().to_string());
    } else {
        lines.push(raw_line);
    }

    lines.join("\n")
}

/// Per-attribute breakdown, one row per attribute with its weighted deltas.
pub fn format_breakdown(result: &Classification, table: &AttributeTable) -> String {
    let name_width = result
        .contributions
        .iter()
        .map(|c| c.attribute.len())
        .max()
        .unwrap_or(0);
    let header: Vec<String> = table
        .categories
        .iter()
        .map(|c| format!("{:>10}", c))
        .collect();

    let mut lines = vec![format!(
        "{:<nw$}  {:>6}  {}",
        "attribute",
        "weight",
        header.join(""),
        nw = name_width
    )];
    for contribution in &result.contributions {
        let deltas: Vec<String> = contribution
            .deltas
            .iter()
            .map(|d| format!("{:>+10.4}", d))
            .collect();
        lines.push(format!(
            "{:<nw$}  {:>6.2}  {}",
            contribution.attribute,
            contribution.weight,
            deltas.join(""),
            nw = name_width
        ));
    }
    lines.join("\n")
}

/// Plain-text export: verdict line followed by the explanation.
pub fn format_export(name: &str, result: &Classification) -> String {
    format!(
        "{} -> {} ({})\n\nDetails:\n{}\n",
        name,
        result.majority,
        format_percent(result.majority_percent),
        format_explanation(result).join("\n")
    )
}

/// Canonical JSON for scripting.
pub fn format_json(result: &Classification) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&result.canonical())
}

/// One row per named classification: name, majority, percentages.
pub fn format_summary_table(rows: &[(&str, &Classification)], use_colors: bool) -> String {
    if rows.is_empty() {
        return "No presets configured.".to_string();
    }

    let name_width = rows.iter().map(|(n, _)| n.chars().count()).max().unwrap_or(0);
    rows.iter()
        .enumerate()
        .map(|(idx, (name, result))| {
            let index_str = format!("{:>2}.", idx + 1);
            let name_padded = format!("{:<w$}", name, w = name_width);
            let verdict = format!("{:<10}", result.majority);
            if use_colors {
                format!(
                    "{} {}  {}  {}",
                    index_str.dimmed(),
                    name_padded.bold(),
                    verdict,
                    format_tally(result, true)
                )
            } else {
                format!(
                    "{} {}  {}  {}",
                    index_str,
                    name_padded,
                    verdict,
                    format_tally(result, false)
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{classify, ClassifyOptions, Features, Weights};

    fn sample(features: Features) -> Classification {
        classify(
            &features,
            &Weights::default(),
            &AttributeTable::default(),
            &ClassifyOptions::default(),
        )
        .unwrap()
    }

    fn soup() -> Classification {
        sample(
            Features::new()
                .with("temperature", "hot")
                .with("utensil", "spoon")
                .with("container", "bowl")
                .with("submersion", 1.0),
        )
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(90.7), "90.7%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(100.0), "100.0%");
    }

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(50.0, 10), "█████░░░░░");
        assert_eq!(format_bar(0.0, 4), "░░░░");
        assert_eq!(format_bar(100.0, 4), "████");
        assert_eq!(format_bar(140.0, 4), "████");
    }

    #[test]
    fn test_format_tally_plain() {
        let tally = format_tally(&soup(), false);
        assert!(tally.starts_with("soup "));
        assert_eq!(tally.matches(" | ").count(), 2);
        assert!(!tally.contains("close call"));
    }

    #[test]
    fn test_format_tally_marks_close_call() {
        let mut ambiguous = sample(Features::new());
        ambiguous.is_ambiguous = true;
        assert!(format_tally(&ambiguous, false).ends_with("(close call)"));
    }

    #[test]
    fn test_format_explanation() {
        let lines = format_explanation(&soup());
        assert!(lines[0].starts_with("Raw scores: soup: "));
        assert!(lines[1].starts_with("Normalized percentages: soup: "));
        assert!(lines[2].starts_with("Top: soup ("));
        assert!(lines.last().unwrap().contains("discrete_pieces = false (default)"));
        assert!(!lines.iter().any(|l| l == CLOSE_CALL));
    }

    #[test]
    fn test_format_explanation_degenerate() {
        let result = classify(
            &Features::new(),
            &Weights::default().uniform(0.0),
            &AttributeTable::default(),
            &ClassifyOptions::default(),
        )
        .unwrap();
        let lines = format_explanation(&result);
        assert!(lines.iter().any(|l| l.contains("even split")));
        assert!(lines.iter().any(|l| l == CLOSE_CALL));
    }

    #[test]
    fn test_format_report_plain() {
        let report = format_report("Tomato Soup", &soup(), &AttributeTable::default(), false);
        assert!(report.starts_with("Tomato Soup\nMajority: soup ("));
        assert!(report.contains("  Temperature: hot"));
        assert!(report.contains("  Dressing / coating (0-1): 0 (default)"));
        assert!(report.contains("Raw scores: soup="));
    }

    #[test]
    fn test_format_breakdown() {
        let result = soup();
        let breakdown = format_breakdown(&result, &AttributeTable::default());
        let lines: Vec<&str> = breakdown.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].contains("soup"));
        assert!(lines[4].starts_with("submersion"));
        assert!(lines[4].contains("+0.3000"));
    }

    #[test]
    fn test_format_export() {
        let text = format_export("Tomato Soup", &soup());
        assert!(text.starts_with("Tomato Soup -> soup ("));
        assert!(text.contains("\n\nDetails:\nRaw scores:"));
    }

    #[test]
    fn test_format_json() {
        let json = format_json(&soup()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["majority"], "soup");
        assert!(value["percentages"]["salad"].is_number());
        assert_eq!(value["resolved_inputs"]["utensil"], "spoon");
    }

    #[test]
    fn test_format_summary_table() {
        let result = soup();
        let table = format_summary_table(&[("Tomato Soup", &result), ("Broth", &result)], false);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(" 1. Tomato Soup  soup"));
        assert!(lines[1].starts_with(" 2. Broth        soup"));
    }

    #[test]
    fn test_format_summary_table_empty() {
        assert_eq!(format_summary_table(&[], false), "No presets configured.");
    }
}
