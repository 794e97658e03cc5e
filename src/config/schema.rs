use serde::{Deserialize, Serialize};

use crate::scoring::{
    validate_scoring, AttributeTable, ClassifyOptions, Features, ValidationMode, Weights,
    DEFAULT_AMBIGUITY_THRESHOLD,
};

/// On-disk configuration. Every field is optional; gaps are filled from the
/// built-in soup/salad/sandwich tuning.
///
/// Example YAML:
/// ```yaml
/// ambiguity_threshold: 10
/// validation: permissive
/// weights:
///   bread_presence: 0.5
/// presets:
///   - name: Ramen
///     features: { temperature: hot, utensil: spoon, container: bowl, submersion: 0.8 }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Percentage-point gap under which a result is a close call (default: 8.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiguity_threshold: Option<f64>,

    /// strict, clamp (default) or permissive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationMode>,

    /// Attribute table; replaces the built-in one entirely when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<AttributeTable>,

    /// With the built-in table these override individual default weights;
    /// with a custom table they must name every attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Weights>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<Vec<Preset>>,
}

/// A named feature vector, e.g. "Tomato Soup".
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Preset {
    pub name: String,
    pub features: Features,
}

/// Configuration with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub table: AttributeTable,
    pub weights: Weights,
    pub options: ClassifyOptions,
    pub presets: Vec<Preset>,
}

impl Config {
    /// The built-in configuration with every field spelled out.
    pub fn with_defaults() -> Self {
        Self {
            ambiguity_threshold: Some(DEFAULT_AMBIGUITY_THRESHOLD),
            validation: Some(ValidationMode::default()),
            table: Some(AttributeTable::default()),
            weights: Some(Weights::default()),
            presets: Some(default_presets()),
        }
    }

    pub fn effective(&self) -> EffectiveConfig {
        let (table, weights, presets) = match &self.table {
            Some(table) => (
                table.clone(),
                self.weights.clone().unwrap_or_else(Weights::empty),
                self.presets.clone().unwrap_or_default(),
            ),
            None => {
                let weights = match &self.weights {
                    Some(overrides) => Weights::default().merged(overrides),
                    None => Weights::default(),
                };
                (
                    AttributeTable::default(),
                    weights,
                    self.presets.clone().unwrap_or_else(default_presets),
                )
            }
        };

        EffectiveConfig {
            table,
            weights,
            options: ClassifyOptions {
                ambiguity_threshold: self
                    .ambiguity_threshold
                    .unwrap_or(DEFAULT_AMBIGUITY_THRESHOLD),
                validation: self.validation.unwrap_or_default(),
            },
            presets,
        }
    }
}

impl EffectiveConfig {
    /// Find a preset by name, ignoring case.
    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Apply `name=weight` overrides on top of the configured weights.
    ///
    /// The result is held to the same checks as weights from the config
    /// file, so a misspelled name or an out-of-range value is an error
    /// instead of a silent no-op. Returns all errors at once.
    pub fn with_weight_overrides<S: AsRef<str>>(
        &self,
        assignments: &[S],
    ) -> Result<Weights, Vec<String>> {
        let mut weights = self.weights.clone();
        weights
            .apply_assignments(assignments)
            .map_err(|e| vec![format!("{:#}", e)])?;
        validate_scoring(&self.table, &weights, self.options.ambiguity_threshold)?;
        Ok(weights)
    }
}

#[allow(clippy::too_many_arguments)]
fn preset(
    name: &str,
    temperature: &str,
    utensil: &str,
    container: &str,
    submersion: f64,
    dressing: f64,
    discrete: bool,
    bread: bool,
    portability: f64,
) -> Preset {
    Preset {
        name: name.to_string(),
        features: Features::new()
            .with("temperature", temperature)
            .with("utensil", utensil)
            .with("container", container)
            .with("submersion", submersion)
            .with("dressing_coating", dressing)
            .with("discrete_pieces", discrete)
            .with("bread_presence", bread)
            .with("portability", portability),
    }
}

/// Reference dishes for the built-in table.
pub fn default_presets() -> Vec<Preset> {
    vec![
        preset("Tomato Soup", "hot", "spoon", "bowl", 1.0, 0.0, false, false, 0.0),
        preset("Caesar Salad", "room", "fork", "plate", 0.0, 0.6, true, false, 0.2),
        preset("BLT Sandwich", "room", "hand", "bread / bun", 0.0, 0.1, false, true, 1.0),
        preset("Gazpacho", "cold", "spoon", "bowl", 0.9, 0.0, false, false, 0.0),
        preset("Bread-bowl Chili", "hot", "spoon", "bread bowl", 0.8, 0.0, false, true, 0.3),
        preset("Soft Taco", "warm", "hand", "bread / bun", 0.0, 0.2, true, true, 0.9),
    ]
}
