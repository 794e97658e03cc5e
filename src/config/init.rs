use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{get_config_path, save_config, Config};
use crate::scoring::{AttributeTable, Weights};

/// Prompt user with a message and return their trimmed input.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> Result<String> {
    write!(output, "{}", message)?;
    output.flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read input")?;
    Ok(line.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
    default: &str,
) -> Result<String> {
    let answer = prompt(input, output, &format!("{} [{}]: ", message, default))?;
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
    default_yes: bool,
) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let answer = prompt(input, output, &format!("{} [{}]: ", message, hint))?.to_lowercase();
    if answer.is_empty() {
        Ok(default_yes)
    } else {
        Ok(answer == "y" || answer == "yes")
    }
}

/// Ask for every attribute's weight, re-prompting until it is inside the
/// attribute's documented range.
fn prompt_weights<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    table: &AttributeTable,
    defaults: &Weights,
) -> Result<Weights> {
    let mut weights = defaults.clone();
    for attr in &table.attributes {
        let [low, high] = attr.weight_bounds();
        let default = defaults.get(&attr.name).unwrap_or(low);
        let weight = loop {
            let answer = prompt_with_default(
                input,
                output,
                &format!("{} weight ({} to {})", attr.display_label(), low, high),
                &default.to_string(),
            )?;
            match answer.parse::<f64>() {
                Ok(v) if (low..=high).contains(&v) => break v,
                Ok(_) => writeln!(
                    output,
                    "  Invalid: must be between {} and {}. Try again.",
                    low, high
                )?,
                Err(_) => writeln!(output, "  Invalid: must be a number. Try again.")?,
            }
        };
        weights.set(&attr.name, weight);
    }
    Ok(weights)
}

/// Run the init wizard against arbitrary input/output.
///
/// Returns the written path, or `None` when the user declined to overwrite an
/// existing file.
pub fn run_init_wizard_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    path: PathBuf,
    force: bool,
) -> Result<Option<PathBuf>> {
    writeln!(output, "Soup / Salad / Sandwich configuration")?;
    writeln!(output, "=====================================")?;
    writeln!(output)?;

    if path.exists()
        && !force
        && !prompt_yes_no(
            input,
            output,
            &format!("{} already exists. Overwrite?", path.display()),
            false,
        )?
    {
        writeln!(output, "Left {} unchanged.", path.display())?;
        return Ok(None);
    }

    let mut config = Config::with_defaults();
    let table = AttributeTable::default();
    let defaults = Weights::default();

    if prompt_yes_no(input, output, "Tune weights? (n accepts defaults)", false)? {
        writeln!(output)?;
        writeln!(
            output,
            "Weights set how much each attribute matters. They do not need to add up to 1."
        )?;
        config.weights = Some(prompt_weights(input, output, &table, &defaults)?);
    }

    save_config(&path, &config)?;
    writeln!(output)?;
    writeln!(output, "Wrote {}", path.display())?;
    Ok(Some(path))
}

/// Run the interactive init wizard on the terminal.
///
/// If `path` is None, the default config path is used.
pub fn run_init_wizard(path: Option<PathBuf>, force: bool) -> Result<Option<PathBuf>> {
    let path = match path {
        Some(p) => p,
        None => get_config_path()?,
    };
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_init_wizard_with(&mut stdin.lock(), &mut stdout.lock(), path, force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use std::env;
    use std::io::Cursor;

    fn run(script: &str, path: PathBuf, force: bool) -> (Option<PathBuf>, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        let written = run_init_wizard_with(&mut input, &mut output, path, force).unwrap();
        (written, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_accept_defaults() {
        let temp_path = env::temp_dir().join("sss_test_init_defaults.yaml");
        let _ = std::fs::remove_file(&temp_path);

        let (written, _) = run("\n", temp_path.clone(), false);
        assert_eq!(written, Some(temp_path.clone()));
        assert_eq!(load_config(Some(temp_path.clone())).unwrap(), Config::with_defaults());

        let _ = std::fs::remove_file(&temp_path);
    }

    #[test]
    fn test_tuned_weights_reprompt_out_of_range() {
        let temp_path = env::temp_dir().join("sss_test_init_tuned.yaml");
        let _ = std::fs::remove_file(&temp_path);

        // temperature: 0.9 is above its 0.5 cap, then 0.4; everything else default
        let script = "y\n0.9\n0.4\n\n\n\n\n\n\n\n";
        let (written, transcript) = run(script, temp_path.clone(), false);
        assert!(written.is_some());
        assert!(transcript.contains("Invalid: must be between 0 and 0.5"));

        let config = load_config(Some(temp_path.clone())).unwrap();
        let weights = config.effective().weights;
        assert_eq!(weights.get("temperature"), Some(0.4));
        assert_eq!(weights.get("utensil"), Some(0.15));

        let _ = std::fs::remove_file(&temp_path);
    }

    #[test]
    fn test_existing_file_kept_when_declined() {
        let temp_path = env::temp_dir().join("sss_test_init_existing.yaml");
        std::fs::write(&temp_path, "ambiguity_threshold: 3\n").unwrap();

        let (written, transcript) = run("n\n", temp_path.clone(), false);
        assert!(written.is_none());
        assert!(transcript.contains("unchanged"));
        assert_eq!(
            std::fs::read_to_string(&temp_path).unwrap(),
            "ambiguity_threshold: 3\n"
        );

        let (written, _) = run("\n", temp_path.clone(), true);
        assert!(written.is_some());

        let _ = std::fs::remove_file(&temp_path);
    }
}
