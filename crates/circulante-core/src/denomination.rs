use std::fmt;

use crate::error::{CirculanteError, Result};

/// Face value of a banknote or coin, kept in the two-decimal label form the
/// cash series uses in its `Denominacao` field (`"0.50"`, `"200.00"`).
#[derive(Debug, Clone, PartialEq)]
pub struct Denomination {
    face_value: f64,
    label: String,
}

impl Denomination {
    pub fn from_face_value(face_value: f64) -> Self {
        Self {
            face_value,
            label: format!("{face_value:.2}"),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => Ok(Self::from_face_value(value)),
            _ => Err(CirculanteError::InvalidDenomination(trimmed.to_string())),
        }
    }

    /// Parses a comma separated list such as `"0.5,2,50.00"`. Empty entries are skipped.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        raw.split(',')
            .filter(|item| !item.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn face_value(&self) -> f64 {
        self.face_value
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether an upstream `Denominacao` value names this denomination.
    pub fn matches(&self, upstream: &str) -> bool {
        normalize_label(upstream) == self.label
    }
}

/// Canonical two-decimal spelling of an upstream `Denominacao` value. Values
/// that are not numeric are returned trimmed but otherwise untouched.
pub fn normalize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => format!("{value:.2}"),
        _ => trimmed.to_string(),
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
