use std::collections::{BTreeMap, HashSet};

use super::factors::Term;
use super::features::Weights;
use super::table::{AttributeKind, AttributeTable};

/// Validate the attribute table and weights at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(
    table: &AttributeTable,
    weights: &Weights,
    ambiguity_threshold: f64,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if table.categories.is_empty() {
        errors.push("categories: at least one category is required".to_string());
    }
    let mut seen = HashSet::new();
    for (i, category) in table.categories.iter().enumerate() {
        if category.trim().is_empty() {
            errors.push(format!("categories[{}]: must not be empty", i));
        } else if !seen.insert(category.as_str()) {
            errors.push(format!("categories[{}]: duplicate category '{}'", i, category));
        }
    }

    if !ambiguity_threshold.is_finite() || ambiguity_threshold < 0.0 {
        errors.push(format!(
            "ambiguity_threshold: must be non-negative, got {}",
            ambiguity_threshold
        ));
    }

    let mut seen_attrs = HashSet::new();
    for (i, attr) in table.attributes.iter().enumerate() {
        let path = format!("attributes[{}]", i);

        if attr.name.trim().is_empty() {
            errors.push(format!("{}.name: must not be empty", path));
        } else if !seen_attrs.insert(attr.name.as_str()) {
            errors.push(format!("{}.name: duplicate attribute '{}'", path, attr.name));
        }

        let [low, high] = attr.weight_bounds();
        if !(low <= high) || low < 0.0 {
            errors.push(format!("{}.weight_range: invalid [{}, {}]", path, low, high));
        }

        match weights.get(&attr.name) {
            None => errors.push(format!("weights.{}: missing", attr.name)),
            Some(w) if !w.is_finite() || w < 0.0 => {
                errors.push(format!("weights.{}: must be non-negative, got {}", attr.name, w))
            }
            Some(w) if w < low || w > high => errors.push(format!(
                "weights.{}: {} is outside [{}, {}]",
                attr.name, w, low, high
            )),
            Some(_) => {}
        }

        match attr.kind() {
            None => errors.push(format!(
                "{}: must declare exactly one of categorical, numeric or flag",
                path
            )),
            Some(AttributeKind::Categorical(def)) => {
                let path = format!("{}.categorical", path);
                if def.options.is_empty() {
                    errors.push(format!("{}.options: at least one option is required", path));
                }
                if def.option(&def.default).is_none() {
                    errors.push(format!(
                        "{}.default: '{}' is not one of the options",
                        path, def.default
                    ));
                }
                let mut seen_options = HashSet::new();
                for (j, option) in def.options.iter().enumerate() {
                    if !seen_options.insert(option.name.as_str()) {
                        errors.push(format!(
                            "{}.options[{}]: duplicate option '{}'",
                            path, j, option.name
                        ));
                    }
                    for (category, score) in &option.scores {
                        if !table.categories.contains(category) {
                            errors.push(format!(
                                "{}.options[{}].scores.{}: unknown category",
                                path, j, category
                            ));
                        }
                        if !score.is_finite() {
                            errors.push(format!(
                                "{}.options[{}].scores.{}: must be finite",
                                path, j, category
                            ));
                        }
                    }
                }
            }
            Some(AttributeKind::Numeric(def)) => {
                let path = format!("{}.numeric", path);
                let [min, max] = def.range;
                if !(min < max) {
                    errors.push(format!("{}.range: invalid [{}, {}]", path, min, max));
                } else if !(min..=max).contains(&def.default) {
                    errors.push(format!(
                        "{}.default: {} is outside [{}, {}]",
                        path, def.default, min, max
                    ));
                }
                check_terms(&path, &def.terms, table, &mut errors);
            }
            Some(AttributeKind::Flag(def)) => {
                check_terms(&format!("{}.flag", path), &def.terms, table, &mut errors);
            }
        }
    }

    for (name, _) in weights.iter() {
        if table.attribute(name).is_none() {
            errors.push(format!("weights.{}: no such attribute", name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_terms(
    path: &str,
    terms: &BTreeMap<String, Term>,
    table: &AttributeTable,
    errors: &mut Vec<String>,
) {
    for (category, term) in terms {
        if !table.categories.contains(category) {
            errors.push(format!("{}.terms.{}: unknown category", path, category));
        }
        if !term.coefficient.is_finite() {
            errors.push(format!("{}.terms.{}: coefficient must be finite", path, category));
        }
    }
}
