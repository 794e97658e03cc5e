use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::ClassifyError;
use super::factors::Term;
use super::features::{FeatureValue, Features, Weights};
use super::table::{
    AttributeDef, AttributeKind, AttributeTable, CategoricalDef, FlagDef, NumericDef,
};

/// Gap, in percentage points, below which the top two categories count as a close call.
pub const DEFAULT_AMBIGUITY_THRESHOLD: f64 = 8.0;

/// Raw totals at or below this are treated as "nothing contributed".
const ZERO_TOLERANCE: f64 = 1e-9;

/// How out-of-domain feature values are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Reject any value outside its declared domain.
    Strict,
    /// Clamp numbers into range; reject unknown categorical options.
    #[default]
    Clamp,
    /// Clamp numbers; replace unknown options and mistyped values with the
    /// declared default.
    Permissive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyOptions {
    pub ambiguity_threshold: f64,
    pub validation: ValidationMode,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            ambiguity_threshold: DEFAULT_AMBIGUITY_THRESHOLD,
            validation: ValidationMode::default(),
        }
    }
}

/// Where a resolved attribute value came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputSource {
    Provided,
    Defaulted,
    Clamped { original: f64 },
    Substituted { original: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedInput {
    pub attribute: String,
    pub value: String,
    pub source: InputSource,
}

impl ResolvedInput {
    /// Human-readable value, annotated when it was not taken as given.
    pub fn describe(&self) -> String {
        match &self.source {
            InputSource::Provided => self.value.clone(),
            InputSource::Defaulted => format!("{} (default)", self.value),
            InputSource::Clamped { original } => {
                format!("{} (clamped from {})", self.value, original)
            }
            InputSource::Substituted { original } => {
                format!("{} (substituted for '{}')", self.value, original)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category: String,
    /// Accumulated weighted score, floored at zero
    pub raw: f64,
    /// Share of the total to one decimal place; the shares of a result add up
    /// to 100 within 0.1
    pub percent: f64,
}

/// Weighted per-category deltas one attribute added to the raw scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeContribution {
    pub attribute: String,
    pub weight: f64,
    /// Parallel to the table's categories
    pub deltas: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// One entry per category, in table order
    pub scores: Vec<CategoryScore>,
    pub majority: String,
    pub majority_percent: f64,
    pub is_ambiguous: bool,
    /// Every raw score was zero; percentages are a uniform split
    pub degenerate: bool,
    pub resolved_inputs: Vec<ResolvedInput>,
    pub contributions: Vec<AttributeContribution>,
    /// Features that named no attribute in the table
    pub ignored_features: Vec<String>,
}

/// Canonical interchange shape of a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalResult {
    pub percentages: BTreeMap<String, f64>,
    pub majority: String,
    pub majority_percent: f64,
    pub is_ambiguous: bool,
    pub raw_scores: BTreeMap<String, f64>,
    pub resolved_inputs: BTreeMap<String, String>,
}

impl Classification {
    pub fn percent_of(&self, category: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.percent)
    }

    pub fn percentages(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|s| (s.category.clone(), s.percent))
            .collect()
    }

    pub fn raw_scores(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|s| (s.category.clone(), s.raw))
            .collect()
    }

    pub fn canonical(&self) -> CanonicalResult {
        CanonicalResult {
            percentages: self.percentages(),
            majority: self.majority.clone(),
            majority_percent: self.majority_percent,
            is_ambiguous: self.is_ambiguous,
            raw_scores: self.raw_scores(),
            resolved_inputs: self
                .resolved_inputs
                .iter()
                .map(|r| (r.attribute.clone(), r.describe()))
                .collect(),
        }
    }
}

/// Classify a feature vector against an attribute table.
///
/// Pure: the result depends only on the arguments. Each attribute's
/// per-category contribution is scaled by its weight and summed; the sums are
/// floored at zero, normalized to percentages, and the highest share wins with
/// ties going to the category listed first in the table.
pub fn classify(
    features: &Features,
    weights: &Weights,
    table: &AttributeTable,
    options: &ClassifyOptions,
) -> Result<Classification, ClassifyError> {
    if table.categories.is_empty() {
        return Err(ClassifyError::IncompleteConfiguration(
            "attribute table declares no categories".to_string(),
        ));
    }
    if !options.ambiguity_threshold.is_finite() || options.ambiguity_threshold < 0.0 {
        return Err(ClassifyError::IncompleteConfiguration(format!(
            "ambiguity threshold must be a non-negative number, got {}",
            options.ambiguity_threshold
        )));
    }

    let mut ignored_features = Vec::new();
    for (name, _) in features.iter() {
        if table.attribute(name).is_none() {
            if options.validation == ValidationMode::Strict {
                return Err(ClassifyError::invalid_value(name, "unknown attribute"));
            }
            ignored_features.push(name.clone());
        }
    }

    let category_count = table.categories.len();
    let mut raw = vec![0.0; category_count];
    let mut resolved_inputs = Vec::with_capacity(table.attributes.len());
    let mut contributions = Vec::with_capacity(table.attributes.len());

    for attr in &table.attributes {
        let weight = weights.get(&attr.name).ok_or_else(|| {
            ClassifyError::IncompleteConfiguration(format!(
                "no weight for attribute '{}'",
                attr.name
            ))
        })?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(ClassifyError::InvalidWeight {
                attribute: attr.name.clone(),
                weight,
            });
        }

        let value = features.get(&attr.name);
        let (unit, resolved) = match attr.kind() {
            Some(AttributeKind::Categorical(def)) => {
                categorical_contribution(attr, def, value, table, options.validation)?
            }
            Some(AttributeKind::Numeric(def)) => {
                numeric_contribution(attr, def, value, table, options.validation)?
            }
            Some(AttributeKind::Flag(def)) => {
                flag_contribution(attr, def, value, table, options.validation)?
            }
            None => {
                return Err(ClassifyError::IncompleteConfiguration(format!(
                    "attribute '{}' must declare exactly one of categorical, numeric or flag",
                    attr.name
                )))
            }
        };

        let deltas: Vec<f64> = unit.iter().map(|c| weight * c).collect();
        for (total, delta) in raw.iter_mut().zip(&deltas) {
            *total += delta;
        }

        resolved_inputs.push(resolved);
        contributions.push(AttributeContribution {
            attribute: attr.name.clone(),
            weight,
            deltas,
        });
    }

    // Negative impacts are allowed per attribute; only the final totals are floored.
    let floored: Vec<f64> = raw.iter().map(|r| r.max(0.0)).collect();
    let total: f64 = floored.iter().sum();
    let degenerate = total <= ZERO_TOLERANCE;

    let shares: Vec<f64> = if degenerate {
        vec![100.0 / category_count as f64; category_count]
    } else {
        floored.iter().map(|r| r * 100.0 / total).collect()
    };

    let mut top = 0;
    for (i, share) in shares.iter().enumerate() {
        if *share > shares[top] {
            top = i;
        }
    }
    let runner_up = shares
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != top)
        .map(|(_, s)| *s)
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))));
    let is_ambiguous = match runner_up {
        Some(second) => shares[top] - second < options.ambiguity_threshold,
        None => false,
    };

    let percents = display_percents(&shares);
    let scores = table
        .categories
        .iter()
        .zip(floored.iter().zip(&percents))
        .map(|(category, (raw, percent))| CategoryScore {
            category: category.clone(),
            raw: *raw,
            percent: *percent,
        })
        .collect();

    Ok(Classification {
        scores,
        majority: table.categories[top].clone(),
        majority_percent: percents[top],
        is_ambiguous,
        degenerate,
        resolved_inputs,
        contributions,
        ignored_features,
    })
}

/// Round each share half away from zero to one decimal place. With many
/// categories the rounding errors can pile up, so while the total is more
/// than 0.1 off 100 the entry that rounded furthest in the offending
/// direction gives back a tenth. Display only.
fn display_percents(shares: &[f64]) -> Vec<f64> {
    let mut tenths: Vec<f64> = shares.iter().map(|s| (s * 10.0).round()).collect();
    loop {
        let drift = tenths.iter().sum::<f64>() - 1000.0;
        if drift.abs() <= 1.0 {
            break;
        }
        let rounding_error = |i: &usize| tenths[*i] - shares[*i] * 10.0;
        let pick = if drift > 0.0 {
            (0..tenths.len()).max_by(|a, b| rounding_error(a).total_cmp(&rounding_error(b)))
        } else {
            (0..tenths.len()).min_by(|a, b| rounding_error(a).total_cmp(&rounding_error(b)))
        };
        match pick {
            Some(i) => tenths[i] -= drift.signum(),
            None => break,
        }
    }
    tenths.into_iter().map(|t| t / 10.0).collect()
}

fn category_row(
    attr: &AttributeDef,
    table: &AttributeTable,
    entries: impl IntoIterator<Item = (String, f64)>,
) -> Result<Vec<f64>, ClassifyError> {
    let mut row = vec![0.0; table.categories.len()];
    for (category, amount) in entries {
        let idx = table.category_index(&category).ok_or_else(|| {
            ClassifyError::IncompleteConfiguration(format!(
                "attribute '{}' references unknown category '{}'",
                attr.name, category
            ))
        })?;
        row[idx] += amount;
    }
    Ok(row)
}

fn categorical_contribution(
    attr: &AttributeDef,
    def: &CategoricalDef,
    value: Option<&FeatureValue>,
    table: &AttributeTable,
    mode: ValidationMode,
) -> Result<(Vec<f64>, ResolvedInput), ClassifyError> {
    let default_option = def.option(&def.default).ok_or_else(|| {
        ClassifyError::IncompleteConfiguration(format!(
            "attribute '{}' default '{}' is not one of its options",
            attr.name, def.default
        ))
    })?;

    let (option, source) = match value {
        None => (default_option, InputSource::Defaulted),
        Some(FeatureValue::Choice(choice)) => match def.option(choice) {
            Some(option) => (option, InputSource::Provided),
            None if mode == ValidationMode::Permissive => (
                default_option,
                InputSource::Substituted {
                    original: choice.clone(),
                },
            ),
            None => {
                let known: Vec<&str> = def.options.iter().map(|o| o.name.as_str()).collect();
                return Err(ClassifyError::invalid_value(
                    &attr.name,
                    format!("'{}' is not one of [{}]", choice, known.join(", ")),
                ));
            }
        },
        Some(other) if mode == ValidationMode::Permissive => (
            default_option,
            InputSource::Substituted {
                original: other.to_string(),
            },
        ),
        Some(other) => {
            return Err(ClassifyError::invalid_value(
                &attr.name,
                format!("expected an option name, got '{}'", other),
            ))
        }
    };

    let row = category_row(
        attr,
        table,
        option.scores.iter().map(|(c, s)| (c.clone(), *s)),
    )?;
    Ok((
        row,
        ResolvedInput {
            attribute: attr.name.clone(),
            value: option.name.clone(),
            source,
        },
    ))
}

fn numeric_contribution(
    attr: &AttributeDef,
    def: &NumericDef,
    value: Option<&FeatureValue>,
    table: &AttributeTable,
    mode: ValidationMode,
) -> Result<(Vec<f64>, ResolvedInput), ClassifyError> {
    let [min, max] = def.range;
    if !(min < max) {
        return Err(ClassifyError::IncompleteConfiguration(format!(
            "attribute '{}' has an empty range [{}, {}]",
            attr.name, min, max
        )));
    }

    let substitute = |original: &FeatureValue| {
        (
            def.default,
            InputSource::Substituted {
                original: original.to_string(),
            },
        )
    };
    let (given, mut source) = match value {
        None => (def.default, InputSource::Defaulted),
        Some(v @ FeatureValue::Number(n)) if !n.is_finite() => {
            if mode != ValidationMode::Permissive {
                return Err(ClassifyError::invalid_value(&attr.name, "value is not finite"));
            }
            substitute(v)
        }
        Some(FeatureValue::Number(n)) => (*n, InputSource::Provided),
        Some(FeatureValue::Flag(b)) => (if *b { 1.0 } else { 0.0 }, InputSource::Provided),
        Some(v @ FeatureValue::Choice(_)) if mode == ValidationMode::Permissive => substitute(v),
        Some(FeatureValue::Choice(s)) => {
            return Err(ClassifyError::invalid_value(
                &attr.name,
                format!("expected a number, got '{}'", s),
            ))
        }
    };

    let resolved = if given < min || given > max {
        if mode == ValidationMode::Strict {
            return Err(ClassifyError::invalid_value(
                &attr.name,
                format!("{} is outside [{}, {}]", given, min, max),
            ));
        }
        source = InputSource::Clamped { original: given };
        given.clamp(min, max)
    } else {
        given
    };

    let normalized = (resolved - min) / (max - min);
    let row = term_row(attr, &def.terms, normalized, table)?;
    Ok((
        row,
        ResolvedInput {
            attribute: attr.name.clone(),
            value: resolved.to_string(),
            source,
        },
    ))
}

fn flag_contribution(
    attr: &AttributeDef,
    def: &FlagDef,
    value: Option<&FeatureValue>,
    table: &AttributeTable,
    mode: ValidationMode,
) -> Result<(Vec<f64>, ResolvedInput), ClassifyError> {
    let (flag, source) = match value {
        None => (def.default, InputSource::Defaulted),
        Some(FeatureValue::Flag(b)) => (*b, InputSource::Provided),
        Some(FeatureValue::Number(n)) if *n == 0.0 || *n == 1.0 => {
            (*n == 1.0, InputSource::Provided)
        }
        Some(other) if mode == ValidationMode::Permissive => (
            def.default,
            InputSource::Substituted {
                original: other.to_string(),
            },
        ),
        Some(other) => {
            return Err(ClassifyError::invalid_value(
                &attr.name,
                format!("expected true or false, got '{}'", other),
            ))
        }
    };

    let row = term_row(attr, &def.terms, if flag { 1.0 } else { 0.0 }, table)?;
    Ok((
        row,
        ResolvedInput {
            attribute: attr.name.clone(),
            value: flag.to_string(),
            source,
        },
    ))
}

fn term_row(
    attr: &AttributeDef,
    terms: &BTreeMap<String, Term>,
    value: f64,
    table: &AttributeTable,
) -> Result<Vec<f64>, ClassifyError> {
    let entries = terms
        .iter()
        .map(|(category, term)| (category.clone(), term.apply(value)));
    category_row(attr, table, entries)
}


#[cfg(test)]
mod property_tests {
    use super::tests::{assert_sums_to_100, two_way_table};
    use super::*;
    use proptest::prelude::*;

    fn value_strategy(attr: &AttributeDef) -> BoxedStrategy<FeatureValue> {
        match attr.kind() {
            Some(AttributeKind::Categorical(def)) => {
                let choices: Vec<FeatureValue> = def
                    .options
                    .iter()
                    .map(|o| FeatureValue::Choice(o.name.clone()))
                    .collect();
                prop::sample::select(choices).boxed()
            }
            Some(AttributeKind::Numeric(def)) => (def.range[0]..=def.range[1])
                .prop_map(FeatureValue::Number)
                .boxed(),
            Some(AttributeKind::Flag(_)) | None => {
                any::<bool>().prop_map(FeatureValue::Flag).boxed()
            }
        }
    }

    /// Any in-domain feature vector for the built-in table.
    fn features_strategy() -> impl Strategy<Value = Features> {
        let per_attribute: Vec<_> = AttributeTable::default()
            .attributes
            .iter()
            .map(|attr| {
                let name = attr.name.clone();
                value_strategy(attr).prop_map(move |v| (name.clone(), v))
            })
            .collect();
        per_attribute.prop_map(|pairs| pairs.into_iter().collect::<Features>())
    }

    /// Any weight set inside every attribute's documented range.
    fn weights_strategy() -> impl Strategy<Value = Weights> {
        let per_attribute: Vec<_> = AttributeTable::default()
            .attributes
            .iter()
            .map(|attr| {
                let name = attr.name.clone();
                let [low, high] = attr.weight_bounds();
                (low..=high).prop_map(move |w| (name.clone(), w))
            })
            .collect();
        per_attribute.prop_map(|pairs| {
            let mut weights = Weights::empty();
            for (name, w) in pairs {
                weights.set(&name, w);
            }
            weights
        })
    }

    fn share(result: &Classification, category: usize) -> f64 {
        let total: f64 = result.scores.iter().map(|s| s.raw).sum();
        result.scores[category].raw / total
    }

    proptest! {
        /// Property: percentages add up to 100 within 0.1 and none is negative.
        #[test]
        fn percentages_sum_to_100(
            features in features_strategy(),
            weights in weights_strategy()
        ) {
            let table = AttributeTable::default();
            let result = classify(&features, &weights, &table, &ClassifyOptions::default())
                .unwrap();
            assert_sums_to_100(&result);
            prop_assert!(result
                .resolved_inputs
                .iter()
                .all(|r| r.source == InputSource::Provided));
        }

        /// Property: the same holds for any number of categories.
        #[test]
        fn percentages_sum_to_100_for_n_categories(
            raws in prop::collection::vec(0.0..10.0f64, 1..9)
        ) {
            let names: Vec<String> = (0..raws.len()).map(|i| format!("c{}", i)).collect();
            let refs: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
            let scores: Vec<(&str, f64)> =
                refs.iter().copied().zip(raws.iter().copied()).collect();
            let table = two_way_table(&refs, vec![("only", scores)]);
            let weights = Weights::empty().with("pick", 1.0);
            let result =
                classify(&Features::new(), &weights, &table, &ClassifyOptions::default()).unwrap();
            assert_sums_to_100(&result);
        }

        /// Property: pure function - same input always produces same output.
        #[test]
        fn deterministic(
            features in features_strategy(),
            weights in weights_strategy()
        ) {
            let table = AttributeTable::default();
            let options = ClassifyOptions::default();
            let first = classify(&features, &weights, &table, &options).unwrap();
            let second = classify(&features, &weights, &table, &options).unwrap();
            prop_assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
            prop_assert_eq!(first, second);
        }

        /// Property: raising the weight of an attribute whose row feeds only
        /// category X never lowers X's share.
        #[test]
        fn weight_increase_is_monotonic(
            features in features_strategy(),
            weights in weights_strategy(),
            bump in 0.0..1.0f64
        ) {
            let table = AttributeTable::default();
            let options = ClassifyOptions::default();
            let rows = classify(&features, &weights.uniform(1.0), &table, &options).unwrap();
            let before = classify(&features, &weights, &table, &options).unwrap();
            prop_assume!(!before.degenerate);

            for contribution in &rows.contributions {
                let favoured: Vec<usize> = (0..contribution.deltas.len())
                    .filter(|i| contribution.deltas[*i] > 0.0)
                    .collect();
                let exclusive = favoured.len() == 1
                    && contribution.deltas.iter().all(|d| *d >= 0.0);
                if !exclusive {
                    continue;
                }
                let x = favoured[0];

                let base = weights.get(&contribution.attribute).unwrap();
                let raised = weights.clone().with(&contribution.attribute, base + bump);
                let after = classify(&features, &raised, &table, &options).unwrap();
                prop_assert!(
                    share(&after, x) >= share(&before, x) - 1e-12,
                    "{} lowered {}: {} -> {}",
                    contribution.attribute,
                    table.categories[x],
                    share(&before, x),
                    share(&after, x)
                );
            }
        }
    }
}
