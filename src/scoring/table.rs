use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::factors::Term;

/// Static definition of how every attribute feeds the category scores.
///
/// The table is plain data: adding a category or an attribute is a config
/// change, the engine never names either.
///
/// Example YAML:
/// ```yaml
/// categories: [soup, salad, sandwich]
/// attributes:
///   - name: temperature
///     weight_range: [0.0, 0.5]
///     categorical:
///       default: room
///       options:
///         - { name: hot, scores: { soup: 1.0 } }
///         - { name: room, scores: { soup: 0.2, salad: 0.8, sandwich: 0.5 } }
///   - name: submersion
///     numeric:
///       default: 0.0
///       range: [0.0, 1.0]
///       terms: { soup: "x1", salad: "x0.3 of complement" }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AttributeTable {
    /// Category order; also the tie-break order for the majority.
    pub categories: Vec<String>,

    /// Attributes in evaluation order.
    pub attributes: Vec<AttributeDef>,
}

/// A named dimension of classification.
///
/// Exactly one of `categorical`, `numeric` or `flag` must be set; validation
/// rejects anything else.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AttributeDef {
    pub name: String,

    /// Display label for prompts and reports (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Documented tuning bounds for this attribute's weight (default: [0.0, 1.0])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_range: Option<[f64; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorical: Option<CategoricalDef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericDef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<FlagDef>,
}

/// Enumerated options, each with a per-category contribution row.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CategoricalDef {
    pub default: String,
    pub options: Vec<OptionDef>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OptionDef {
    pub name: String,

    /// Contribution per category; categories left out contribute 0.0
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

/// Scalar in a bounded range combined through per-category terms.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NumericDef {
    pub default: f64,

    /// Inclusive `[min, max]`; values are normalized onto [0, 1] before terms apply
    #[serde(default = "unit_range")]
    pub range: [f64; 2],

    /// Term per category, written as e.g. `"x0.3 of complement"`
    #[serde(default)]
    pub terms: BTreeMap<String, Term>,
}

/// Boolean coerced to 0/1 and combined through per-category terms.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FlagDef {
    pub default: bool,

    #[serde(default)]
    pub terms: BTreeMap<String, Term>,
}

fn unit_range() -> [f64; 2] {
    [0.0, 1.0]
}

/// Borrowed view of an attribute's single kind.
#[derive(Debug, Clone, Copy)]
pub enum AttributeKind<'a> {
    Categorical(&'a CategoricalDef),
    Numeric(&'a NumericDef),
    Flag(&'a FlagDef),
}

impl AttributeDef {
    /// The attribute's kind, or `None` when zero or several kinds are declared.
    pub fn kind(&self) -> Option<AttributeKind<'_>> {
        match (&self.categorical, &self.numeric, &self.flag) {
            (Some(c), None, None) => Some(AttributeKind::Categorical(c)),
            (None, Some(n), None) => Some(AttributeKind::Numeric(n)),
            (None, None, Some(f)) => Some(AttributeKind::Flag(f)),
            _ => None,
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn weight_bounds(&self) -> [f64; 2] {
        self.weight_range.unwrap_or([0.0, 1.0])
    }
}

impl CategoricalDef {
    pub fn option(&self, name: &str) -> Option<&OptionDef> {
        self.options.iter().find(|o| o.name == name)
    }
}

impl AttributeTable {
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn category_index(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == name)
    }
}

fn scores(soup: f64, salad: f64, sandwich: f64) -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("soup".to_string(), soup),
        ("salad".to_string(), salad),
        ("sandwich".to_string(), sandwich),
    ])
}

fn option(name: &str, soup: f64, salad: f64, sandwich: f64) -> OptionDef {
    OptionDef {
        name: name.to_string(),
        scores: scores(soup, salad, sandwich),
    }
}

fn terms(entries: &[(&str, Term)]) -> BTreeMap<String, Term> {
    entries
        .iter()
        .map(|(category, term)| (category.to_string(), term.clone()))
        .collect()
}

fn categorical(name: &str, label: &str, default: &str, options: Vec<OptionDef>) -> AttributeDef {
    AttributeDef {
        name: name.to_string(),
        label: Some(label.to_string()),
        weight_range: Some([0.0, 0.5]),
        categorical: Some(CategoricalDef {
            default: default.to_string(),
            options,
        }),
        numeric: None,
        flag: None,
    }
}

fn numeric(name: &str, label: &str, terms: BTreeMap<String, Term>) -> AttributeDef {
    AttributeDef {
        name: name.to_string(),
        label: Some(label.to_string()),
        weight_range: Some([0.0, 1.0]),
        categorical: None,
        numeric: Some(NumericDef {
            default: 0.0,
            range: unit_range(),
            terms,
        }),
        flag: None,
    }
}

fn flag(name: &str, label: &str, terms: BTreeMap<String, Term>) -> AttributeDef {
    AttributeDef {
        name: name.to_string(),
        label: Some(label.to_string()),
        weight_range: Some([0.0, 1.0]),
        categorical: None,
        numeric: None,
        flag: Some(FlagDef {
            default: false,
            terms,
        }),
    }
}

impl Default for AttributeTable {
    /// The soup/salad/sandwich tuning.
    fn default() -> Self {
        Self {
            categories: vec![
                "soup".to_string(),
                "salad".to_string(),
                "sandwich".to_string(),
            ],
            attributes: vec![
                categorical(
                    "temperature",
                    "Temperature",
                    "room",
                    vec![
                        option("hot", 1.0, 0.0, 0.0),
                        option("warm", 0.8, 0.1, 0.1),
                        option("room", 0.2, 0.8, 0.5),
                        option("cold", 0.0, 1.0, 0.5),
                    ],
                ),
                categorical(
                    "utensil",
                    "Utensil",
                    "fork",
                    vec![
                        option("spoon", 1.0, 0.1, 0.0),
                        option("fork", 0.2, 0.9, 0.1),
                        option("knife & fork", 0.1, 0.7, 0.4),
                        option("hand", 0.0, 0.3, 1.0),
                    ],
                ),
                categorical(
                    "container",
                    "Container",
                    "plate",
                    vec![
                        option("bowl", 1.0, 0.2, 0.0),
                        option("plate", 0.1, 0.8, 0.2),
                        option("bread / bun", 0.0, 0.2, 1.0),
                        option("bread bowl", 0.9, 0.1, 0.2),
                        option("none / wrapper", 0.1, 0.4, 0.4),
                    ],
                ),
                numeric(
                    "submersion",
                    "Submersion (0 = none, 1 = fully submerged)",
                    terms(&[
                        ("soup", Term::value(1.0)),
                        ("salad", Term::complement(0.3)),
                        ("sandwich", Term::complement(0.1)),
                    ]),
                ),
                numeric(
                    "dressing_coating",
                    "Dressing / coating (0-1)",
                    terms(&[
                        ("salad", Term::value(1.0)),
                        ("soup", Term::value(0.05)),
                        ("sandwich", Term::value(0.05)),
                    ]),
                ),
                flag(
                    "discrete_pieces",
                    "Discrete pieces (salad-like)",
                    terms(&[("salad", Term::value(1.0)), ("soup", Term::complement(0.05))]),
                ),
                flag(
                    "bread_presence",
                    "Bread / starchy boundary present",
                    terms(&[
                        ("sandwich", Term::value(1.0)),
                        ("soup", Term::value(0.02)),
                        ("salad", Term::value(0.05)),
                    ]),
                ),
                numeric(
                    "portability",
                    "Portability / hand-eaten (0-1)",
                    terms(&[
                        ("sandwich", Term::value(1.0)),
                        ("salad", Term::complement(0.2)),
                        ("soup", Term::complement(0.1)),
                    ]),
                ),
            ],
        }
    }
}
