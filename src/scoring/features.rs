use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A user-chosen value for one attribute.
///
/// Untagged so YAML/JSON scalars map naturally: `true`, `0.6`, `hot`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Flag(bool),
    Number(f64),
    Choice(String),
}

impl FeatureValue {
    /// Parse a value typed on the command line or at a prompt.
    /// `true`/`false`/`yes`/`no` become flags, numbers become numbers,
    /// anything else is a categorical choice.
    pub fn parse_loose(s: &str) -> Self {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => return FeatureValue::Flag(true),
            "false" | "no" | "n" => return FeatureValue::Flag(false),
            _ => {}
        }
        match s.parse::<f64>() {
            Ok(n) if n.is_finite() => FeatureValue::Number(n),
            _ => FeatureValue::Choice(s.to_string()),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Flag(b) => write!(f, "{}", b),
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Choice(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(b: bool) -> Self {
        FeatureValue::Flag(b)
    }
}

impl From<f64> for FeatureValue {
    fn from(n: f64) -> Self {
        FeatureValue::Number(n)
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Choice(s.to_string())
    }
}

/// Feature vector: attribute name to chosen value. Absent attributes fall
/// back to the table's declared default at classification time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Features(BTreeMap<String, FeatureValue>);

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<FeatureValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<FeatureValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply `name=value` assignments on top of the current values.
    pub fn apply_assignments<S: AsRef<str>>(&mut self, assignments: &[S]) -> Result<()> {
        for assignment in assignments {
            let (name, value) = split_assignment(assignment.as_ref())?;
            self.set(name, FeatureValue::parse_loose(value));
        }
        Ok(())
    }
}

impl FromIterator<(String, FeatureValue)> for Features {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Features(iter.into_iter().collect())
    }
}

/// Weight set: attribute name to non-negative scalar. Weights are independent
/// per attribute and need not sum to 1.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<String, f64>);

impl Weights {
    pub fn empty() -> Self {
        Weights(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn set(&mut self, name: &str, weight: f64) {
        self.0.insert(name.to_string(), weight);
    }

    pub fn with(mut self, name: &str, weight: f64) -> Self {
        self.set(name, weight);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    /// Every weight set to `value`, keeping the same attribute names.
    pub fn uniform(&self, value: f64) -> Self {
        Weights(self.0.keys().map(|k| (k.clone(), value)).collect())
    }

    /// Overlay `other` on top of `self`.
    pub fn merged(mut self, other: &Weights) -> Self {
        for (name, weight) in &other.0 {
            self.0.insert(name.clone(), *weight);
        }
        self
    }

    /// Apply `name=weight` assignments on top of the current weights.
    pub fn apply_assignments<S: AsRef<str>>(&mut self, assignments: &[S]) -> Result<()> {
        for assignment in assignments {
            let (name, value) = split_assignment(assignment.as_ref())?;
            let weight: f64 = value
                .parse()
                .with_context(|| format!("Invalid weight for '{}': '{}'", name, value))?;
            self.set(name, weight);
        }
        Ok(())
    }
}

impl Default for Weights {
    /// Default importance of each attribute in the soup/salad/sandwich tuning.
    fn default() -> Self {
        Weights(BTreeMap::from([
            ("temperature".to_string(), 0.10),
            ("utensil".to_string(), 0.15),
            ("container".to_string(), 0.15),
            ("submersion".to_string(), 0.30),
            ("dressing_coating".to_string(), 0.20),
            ("discrete_pieces".to_string(), 0.25),
            ("bread_presence".to_string(), 0.30),
            ("portability".to_string(), 0.15),
        ]))
    }
}

fn split_assignment(s: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = s.split_once('=') else {
        bail!("Expected name=value, got '{}'", s)
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Missing attribute name in '{}'", s);
    }
    Ok((name, value.trim()))
}
