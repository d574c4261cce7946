use serde_json::Value;

use crate::error::{ImportError, Result};
use crate::feature::FeatureCollection;

/// Source column names that may hold a postal code, in priority order.
pub const PLZ_CANDIDATES: &[&str] = &["plz", "PLZ", "postalcode", "postal_code"];

/// Source column names that may hold a population count, in priority order.
pub const POPULATION_CANDIDATES: &[&str] = &["einwohner", "population", "Einwohner", "POPULATION"];

/// First candidate (in list order) that exists as a column in the
/// collection, or `None` when nothing matches.
pub fn detect_column<'a>(collection: &FeatureCollection, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|name| collection.has_column(name))
}

/// Coerce a postal code to five-character zero-padded text.
///
/// Numbers format as integers before padding ("123" and 123 both become
/// "00123"); strings longer than five characters pass through unchanged;
/// null stays null.
pub fn normalize_plz(value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(text) => Ok(Value::String(format!("{text:0>5}"))),
        Value::Number(number) => {
            if let Some(code) = number.as_i64() {
                Ok(Value::String(format!("{code:05}")))
            } else if let Some(code) = number.as_f64() {
                if code.fract() == 0.0 {
                    Ok(Value::String(format!("{:05}", code as i64)))
                } else {
                    Ok(Value::String(format!("{code:0>5}")))
                }
            } else {
                Err(ImportError::Normalize(format!(
                    "postal code value {number} is out of range"
                )))
            }
        }
        other => Err(ImportError::Normalize(format!(
            "unsupported postal code value: {other}"
        ))),
    }
}

/// Coerce a population value to a whole-number count. Missing values
/// default to zero; floats truncate; numeric strings parse.
pub fn normalize_population(value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::from(0i64)),
        Value::Number(number) => {
            if let Some(count) = number.as_i64() {
                Ok(Value::from(count))
            } else if let Some(count) = number.as_f64() {
                Ok(Value::from(count as i64))
            } else {
                Err(ImportError::Normalize(format!(
                    "population value {number} is out of range"
                )))
            }
        }
        Value::String(text) => {
            let trimmed = text.trim();
            if let Ok(count) = trimmed.parse::<i64>() {
                Ok(Value::from(count))
            } else if let Ok(count) = trimmed.parse::<f64>() {
                Ok(Value::from(count as i64))
            } else {
                Err(ImportError::Normalize(format!(
                    "population value '{text}' is not numeric"
                )))
            }
        }
        other => Err(ImportError::Normalize(format!(
            "unsupported population value: {other}"
        ))),
    }
}

/// Write the canonical `plz` and `einwohner` columns into every feature.
///
/// The detected source columns are kept as-is alongside the canonical
/// ones. Without a population source column, `einwohner` is null for
/// every row rather than zero.
pub fn apply(
    collection: &mut FeatureCollection,
    plz_column: &str,
    population_column: Option<&str>,
) -> Result<()> {
    for feature in &mut collection.features {
        let raw_plz = feature
            .properties
            .get(plz_column)
            .cloned()
            .unwrap_or(Value::Null);
        feature
            .properties
            .insert("plz".to_string(), normalize_plz(&raw_plz)?);

        let population = match population_column {
            Some(column) => {
                let raw = feature.properties.get(column).cloned().unwrap_or(Value::Null);
                normalize_population(&raw)?
            }
            None => Value::Null,
        };
        feature.properties.insert("einwohner".to_string(), population);
    }
    Ok(())
}
