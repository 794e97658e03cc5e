pub mod init;
mod schema;

pub use schema::{default_presets, Config, EffectiveConfig, Preset};

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::scoring::{classify, validate_scoring};

/// Get the config directory path (~/.config/sss/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("sss"))
}

/// Get the default config file path (~/.config/sss/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path
///   (~/.config/sss/config.yaml) and falls back to built-in defaults when
///   that file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = match path {
        Some(p) => p,
        None => get_config_path()?,
    };

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        log::debug!(
            "No config at {}, using built-in defaults",
            config_path.display()
        );
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content).with_context(|| {
        format!(
            "Failed to parse config: invalid YAML in {}",
            config_path.display()
        )
    })?;

    log::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}

/// Save configuration as YAML, atomically.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create config directory at {}", dir.display())
            })?;
        }
    }

    let yaml = serde_saphyr::to_string(config).context("Failed to serialize config")?;

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(yaml.as_bytes())
        .context("Failed to write config")?;
    file.commit().context("Failed to save config")?;

    Ok(())
}

/// Validate the resolved configuration at startup, including that every
/// preset classifies cleanly. Returns all errors at once.
pub fn validate_config(config: &EffectiveConfig) -> Result<(), Vec<String>> {
    let mut errors = match validate_scoring(
        &config.table,
        &config.weights,
        config.options.ambiguity_threshold,
    ) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    // Preset checks are only meaningful once the table itself is sound.
    if errors.is_empty() {
        for (i, preset) in config.presets.iter().enumerate() {
            let result = classify(
                &preset.features,
                &config.weights,
                &config.table,
                &config.options,
            );
            if let Err(e) = result {
                errors.push(format!("presets[{}] ({}): {}", i, preset.name, e));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Features;
    use std::env;

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp_path = env::temp_dir().join("sss_test_missing_config.yaml");
        let _ = fs::remove_file(&temp_path);

        let err = load_config(Some(temp_path)).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_path = env::temp_dir().join("sss_test_config_roundtrip.yaml");
        let _ = fs::remove_file(&temp_path);

        let config = Config::with_defaults();
        save_config(&temp_path, &config).unwrap();
        let loaded = load_config(Some(temp_path.clone())).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_file(&temp_path);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let temp_path = env::temp_dir().join("sss_test_invalid_config.yaml");
        fs::write(&temp_path, "weights: [not, a, map]\n").unwrap();

        let err = load_config(Some(temp_path.clone())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));

        let _ = fs::remove_file(&temp_path);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(validate_config(&Config::default().effective()).is_ok());
    }

    #[test]
    fn test_bad_preset_reported() {
        let mut effective = Config::default().effective();
        effective.presets.push(Preset {
            name: "Mystery".to_string(),
            features: Features::new().with("temperature", "lukewarm"),
        });
        let errors = validate_config(&effective).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("presets[6] (Mystery):"));
    }
}
