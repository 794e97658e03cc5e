use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use super::session::{QuizError, QuizSession};
use crate::output::format_tally;
use crate::scoring::{AttributeDef, AttributeKind, Classification, FeatureValue};

/// Read one trimmed line. Returns `None` on end of input.
fn read_answer<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("Failed to read input")?;
    if read == 0 {
        Ok(None)
    } else {
        Ok(Some(line.trim().to_string()))
    }
}

/// Question text, including the choices for categorical attributes.
fn question_text(attr: &AttributeDef, number: usize, total: usize) -> String {
    match attr.kind() {
        Some(AttributeKind::Categorical(def)) => {
            let choices: Vec<String> = def
                .options
                .iter()
                .enumerate()
                .map(|(i, o)| format!("  {}) {}", i + 1, o.name))
                .collect();
            format!(
                "[{}/{}] {}\n{}\n[{}]: ",
                number,
                total,
                attr.display_label(),
                choices.join("\n"),
                def.default
            )
        }
        Some(AttributeKind::Numeric(def)) => format!(
            "[{}/{}] {} ({} to {}) [{}]: ",
            number,
            total,
            attr.display_label(),
            def.range[0],
            def.range[1],
            def.default
        ),
        Some(AttributeKind::Flag(def)) => format!(
            "[{}/{}] {} (y/n) [{}]: ",
            number,
            total,
            attr.display_label(),
            if def.default { "y" } else { "n" }
        ),
        None => format!("[{}/{}] {}: ", number, total, attr.display_label()),
    }
}

/// Interpret a typed answer. Categorical questions also accept the
/// 1-based number of a listed choice.
fn interpret(attr: &AttributeDef, raw: &str) -> FeatureValue {
    if let Some(AttributeKind::Categorical(def)) = attr.kind() {
        if let Some(option) = raw
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| def.options.get(i))
        {
            return FeatureValue::Choice(option.name.clone());
        }
        return FeatureValue::Choice(raw.to_string());
    }
    FeatureValue::parse_loose(raw)
}

/// Drive a quiz session from a line-oriented terminal.
///
/// An empty line skips the question (keeping its default); end of input
/// skips everything that is left. The running tally is printed after every
/// step.
pub fn run_quiz<R: BufRead, W: Write>(
    session: &mut QuizSession<'_>,
    input: &mut R,
    output: &mut W,
    use_colors: bool,
) -> Result<Classification> {
    let mut result = session.start()?;
    let mut at_eof = false;

    while let Some(attr) = session.current_question() {
        let (done, total) = session.progress();

        let answer = if at_eof {
            None
        } else {
            write!(output, "{}", question_text(attr, done + 1, total))?;
            output.flush().context("Failed to flush output")?;
            let answer = read_answer(input)?;
            at_eof = answer.is_none();
            answer
        };

        let step = match answer.as_deref() {
            None | Some("") => session.skip(),
            Some(raw) => session.answer(interpret(attr, raw)),
        };

        match step {
            Ok(next) => {
                result = next;
                if !at_eof {
                    writeln!(output, "{}", format_tally(&result, use_colors))?;
                    writeln!(output)?;
                }
            }
            Err(QuizError::Classify(e)) => {
                log::debug!("rejected answer for {}: {}", attr.name, e);
                writeln!(output, "  Invalid: {}. Try again.", e)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(result)
}
