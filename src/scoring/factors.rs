use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a term multiplies: the attribute value itself or its complement `1 - value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TermSource {
    Value,
    Complement,
}

/// One per-category combination term of a numeric or flag attribute.
///
/// Syntax: `"x<coef>"`, `"x<coef> of value"` or `"x<coef> of complement"`.
/// `"x0.3 of complement"` on a submersion of 0.25 yields `0.3 * 0.75`.
/// Terms are parsed when the table is deserialized, so a malformed term
/// fails config loading rather than classification.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Term {
    pub coefficient: f64,
    pub source: TermSource,
}

impl Term {
    pub fn value(coefficient: f64) -> Self {
        Term {
            coefficient,
            source: TermSource::Value,
        }
    }

    pub fn complement(coefficient: f64) -> Self {
        Term {
            coefficient,
            source: TermSource::Complement,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let (coef_part, source) = if let Some((coef_part, of_part)) = s.split_once(" of ") {
            let source = match of_part.trim() {
                "value" => TermSource::Value,
                "complement" => TermSource::Complement,
                other => bail!("Term source must be 'value' or 'complement', got '{}'", other),
            };
            (coef_part, source)
        } else {
            (s, TermSource::Value)
        };

        let Some(val) = coef_part.trim().strip_prefix('x') else {
            bail!("Term must start with x: {}", s)
        };
        let coefficient: f64 = val.trim().parse()?;
        if !coefficient.is_finite() {
            bail!("Term coefficient must be finite: {}", s);
        }

        Ok(Term {
            coefficient,
            source,
        })
    }

    /// Contribution of this term for a value already normalized to `[0, 1]`.
    pub fn apply(&self, value: f64) -> f64 {
        match self.source {
            TermSource::Value => self.coefficient * value,
            TermSource::Complement => self.coefficient * (1.0 - value),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            TermSource::Value => write!(f, "x{}", self.coefficient),
            TermSource::Complement => write!(f, "x{} of complement", self.coefficient),
        }
    }
}

impl TryFrom<String> for Term {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        Term::parse(&s)
    }
}

impl From<Term> for String {
    fn from(term: Term) -> Self {
        term.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_coefficient() {
        let term = Term::parse("x1").unwrap();
        assert_eq!(term.source, TermSource::Value);
        assert_eq!(term.apply(0.6), 0.6);
    }

    #[test]
    fn test_parse_explicit_value() {
        let term = Term::parse("x0.05 of value").unwrap();
        assert_eq!(term.source, TermSource::Value);
        assert!((term.apply(1.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_parse_complement() {
        let term = Term::parse("x0.3 of complement").unwrap();
        assert_eq!(term.source, TermSource::Complement);
        assert!((term.apply(0.0) - 0.3).abs() < 1e-12);
        assert_eq!(term.apply(1.0), 0.0);
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let term = Term::parse("  x 0.2  of   complement ").unwrap();
        assert_eq!(term.coefficient, 0.2);
        assert_eq!(term.source, TermSource::Complement);
    }

    #[test]
    fn test_parse_negative_coefficient() {
        let term = Term::parse("x-0.5").unwrap();
        assert_eq!(term.apply(1.0), -0.5);
    }

    #[test]
    fn test_parse_missing_prefix() {
        assert!(Term::parse("0.3 of complement").is_err());
        assert!(Term::parse("+1").is_err());
    }

    #[test]
    fn test_parse_unknown_source() {
        let err = Term::parse("x0.3 of remainder").unwrap_err();
        assert!(err.to_string().contains("remainder"));
    }

    #[test]
    fn test_parse_non_numeric() {
        assert!(Term::parse("xabc").is_err());
        assert!(Term::parse("xinf").is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for term in [Term::value(1.0), Term::complement(0.3), Term::value(-0.05)] {
            assert_eq!(Term::parse(&term.to_string()).unwrap(), term);
        }
        assert_eq!(Term::complement(0.3).to_string(), "x0.3 of complement");
    }

    #[test]
    fn test_deserialize_rejects_malformed_term() {
        let term: Term = serde_saphyr::from_str("\"x0.2 of complement\"").unwrap();
        assert_eq!(term, Term::complement(0.2));

        let err = serde_saphyr::from_str::<Term>("\"0.3 of rest\"").unwrap_err();
        assert!(err.to_string().contains("rest"));
    }
}
