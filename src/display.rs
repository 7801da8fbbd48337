//! Derived display values: config merging, ratios and photo ordering.

use crate::error::{AppError, Result};
use crate::models::{
    EffectiveConfig, GalleryConfig, GlobalConfig, Measurement, RatioDefinition, RatioValue,
    SortOrder,
};

/// Apply a gallery override on top of the user's global config
pub fn merge_configs(global: &GlobalConfig, gallery: Option<&GalleryConfig>) -> EffectiveConfig {
    let (unit_system, measurements, ratios, is_inherited) = match gallery {
        None => (
            global.unit_system,
            global.measurements.clone(),
            global.ratios.clone(),
            true,
        ),
        Some(over) => (
            over.unit_system.unwrap_or(global.unit_system),
            over.measurements
                .clone()
                .unwrap_or_else(|| global.measurements.clone()),
            over.ratios.clone().unwrap_or_else(|| global.ratios.clone()),
            false,
        ),
    };

    EffectiveConfig {
        unit_system,
        measurements,
        ratios,
        sort_order: global.sort_order,
        is_inherited,
        weight_unit: unit_system.weight_unit(),
        measurement_unit: unit_system.measurement_unit(),
    }
}

/// Evaluate each ratio against a photo's measurements.
///
/// Ratios referencing a missing or empty measurement, or with a zero
/// denominator, are left out.
pub fn compute_ratios(measurements: &[Measurement], ratios: &[RatioDefinition]) -> Vec<RatioValue> {
    let lookup = |label: &str| {
        measurements
            .iter()
            .find(|m| m.label == label)
            .and_then(|m| m.value)
    };

    ratios
        .iter()
        .filter_map(|ratio| {
            let numerator = lookup(&ratio.numerator)?;
            let denominator = lookup(&ratio.denominator)?;
            if denominator == 0.0 {
                return None;
            }
            let raw = numerator / denominator;
            if !raw.is_finite() {
                return None;
            }
            let value = round3(raw);
            Some(RatioValue {
                name: ratio.name.clone(),
                value,
                display: format_ratio(value),
            })
        })
        .collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Three decimals with trailing zeros trimmed: `1.500` -> `1.5`, `2.000` -> `2`
pub fn format_ratio(value: f64) -> String {
    let fixed = format!("{:.3}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Stable sort by `YYYY-MM-DD` date key
pub fn sort_by_date<T>(items: &mut [T], order: SortOrder, date: impl Fn(&T) -> &str) {
    match order {
        SortOrder::Chronological => items.sort_by(|a, b| date(a).cmp(date(b))),
        SortOrder::ReverseChronological => items.sort_by(|a, b| date(b).cmp(date(a))),
    }
}

/// Empty labels and later duplicates are dropped
pub fn normalize_measurements(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim().to_string();
        if !label.is_empty() && !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

/// Validate ratio definitions and drop those referencing unknown labels
pub fn normalize_ratios(
    ratios: Vec<RatioDefinition>,
    measurements: Option<&[String]>,
) -> Result<Vec<RatioDefinition>> {
    let mut out: Vec<RatioDefinition> = Vec::with_capacity(ratios.len());
    for ratio in ratios {
        let ratio = RatioDefinition {
            name: ratio.name.trim().to_string(),
            numerator: ratio.numerator.trim().to_string(),
            denominator: ratio.denominator.trim().to_string(),
        };
        if ratio.name.is_empty() || ratio.numerator.is_empty() || ratio.denominator.is_empty() {
            return Err(AppError::BadRequest(
                "Ratio name, numerator and denominator are required".to_string(),
            ));
        }
        if ratio.numerator == ratio.denominator {
            return Err(AppError::BadRequest(
                "Numerator and denominator must be different measurements".to_string(),
            ));
        }
        if out.iter().any(|r| r.name == ratio.name) {
            return Err(AppError::BadRequest(
                "A ratio with this name already exists".to_string(),
            ));
        }
        if let Some(labels) = measurements {
            if !labels.contains(&ratio.numerator) || !labels.contains(&ratio.denominator) {
                tracing::debug!("Dropping ratio {} with unknown measurement", ratio.name);
                continue;
            }
        }
        out.push(ratio);
    }
    Ok(out)
}

pub fn normalize_global(config: GlobalConfig) -> Result<GlobalConfig> {
    let measurements = normalize_measurements(config.measurements);
    let ratios = normalize_ratios(config.ratios, Some(&measurements))?;
    Ok(GlobalConfig {
        measurements,
        ratios,
        ..config
    })
}

pub fn normalize_override(config: GalleryConfig) -> Result<GalleryConfig> {
    let measurements = config.measurements.map(normalize_measurements);
    let ratios = match config.ratios {
        Some(ratios) => Some(normalize_ratios(ratios, measurements.as_deref())?),
        None => None,
    };
    Ok(GalleryConfig {
        unit_system: config.unit_system,
        measurements,
        ratios,
    })
}

/// Blank measurement slots for a new photo
pub fn blank_measurements(labels: &[String]) -> Vec<Measurement> {
    labels
        .iter()
        .map(|label| Measurement {
            label: label.clone(),
            value: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitSystem;

    fn m(label: &str, value: Option<f64>) -> Measurement {
        Measurement {
            label: label.to_string(),
            value,
        }
    }

    fn ratio(name: &str, num: &str, den: &str) -> RatioDefinition {
        RatioDefinition {
            name: name.to_string(),
            numerator: num.to_string(),
            denominator: den.to_string(),
        }
    }

    #[test]
    fn test_compute_ratios_rounds_and_trims() {
        let measurements = vec![m("Shoulders", Some(50.0)), m("Waist", Some(30.0))];
        let ratios = vec![
            ratio("Shoulder-to-Waist", "Shoulders", "Waist"),
            ratio("Waist-to-Shoulder", "Waist", "Shoulders"),
        ];
        let out = compute_ratios(&measurements, &ratios);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Shoulder-to-Waist");
        assert_eq!(out[0].value, 1.667);
        assert_eq!(out[0].display, "1.667");
        assert_eq!(out[1].display, "0.6");
    }

    #[test]
    fn test_compute_ratios_skips_missing_and_zero() {
        let measurements = vec![
            m("Chest", Some(40.0)),
            m("Waist", Some(0.0)),
            m("Arms", None),
        ];
        let ratios = vec![
            ratio("zero", "Chest", "Waist"),
            ratio("empty", "Chest", "Arms"),
            ratio("absent", "Chest", "Hips"),
            ratio("ok", "Waist", "Chest"),
        ];
        let out = compute_ratios(&measurements, &ratios);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "ok");
        assert_eq!(out[0].display, "0");
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(2.0), "2");
        assert_eq!(format_ratio(1.5), "1.5");
        assert_eq!(format_ratio(1.25), "1.25");
        assert_eq!(format_ratio(0.333), "0.333");
        assert_eq!(format_ratio(10.0), "10");
    }

    #[test]
    fn test_merge_without_override_inherits() {
        let global = GlobalConfig {
            unit_system: UnitSystem::Metric,
            ..GlobalConfig::default()
        };
        let merged = merge_configs(&global, None);
        assert!(merged.is_inherited);
        assert_eq!(merged.unit_system, UnitSystem::Metric);
        assert_eq!(merged.weight_unit, "kg");
        assert_eq!(merged.measurement_unit, "cm");
        assert_eq!(merged.measurements, vec!["Waist", "Chest", "Arms"]);
    }

    #[test]
    fn test_merge_override_fields_fall_back_individually() {
        let global = GlobalConfig {
            ratios: vec![ratio("r", "Waist", "Chest")],
            sort_order: SortOrder::ReverseChronological,
            ..GlobalConfig::default()
        };
        let over = GalleryConfig {
            unit_system: None,
            measurements: Some(vec!["Hips".to_string()]),
            ratios: None,
        };
        let merged = merge_configs(&global, Some(&over));
        assert!(!merged.is_inherited);
        assert_eq!(merged.unit_system, UnitSystem::Imperial);
        assert_eq!(merged.weight_unit, "lbs");
        assert_eq!(merged.measurements, vec!["Hips"]);
        assert_eq!(merged.ratios, global.ratios);
        assert_eq!(merged.sort_order, SortOrder::ReverseChronological);
    }

    #[test]
    fn test_sort_by_date() {
        let mut dates = vec!["2024-02-01", "2024-01-01", "2024-03-01"];
        sort_by_date(&mut dates, SortOrder::Chronological, |d| *d);
        assert_eq!(dates, vec!["2024-01-01", "2024-02-01", "2024-03-01"]);
        sort_by_date(&mut dates, SortOrder::ReverseChronological, |d| *d);
        assert_eq!(dates, vec!["2024-03-01", "2024-02-01", "2024-01-01"]);
    }

    #[test]
    fn test_normalize_global_prunes_orphan_ratios() {
        let config = GlobalConfig {
            measurements: vec![" Waist ".into(), "".into(), "Chest".into(), "Waist".into()],
            ratios: vec![ratio("wc", "Waist", "Chest"), ratio("wa", "Waist", "Arms")],
            ..GlobalConfig::default()
        };
        let config = normalize_global(config).unwrap();
        assert_eq!(config.measurements, vec!["Waist", "Chest"]);
        assert_eq!(config.ratios, vec![ratio("wc", "Waist", "Chest")]);
    }

    #[test]
    fn test_normalize_rejects_bad_ratios() {
        let same = normalize_ratios(vec![ratio("x", "Waist", "Waist")], None);
        assert!(matches!(same, Err(AppError::BadRequest(_))));

        let dup = normalize_ratios(
            vec![ratio("x", "Waist", "Chest"), ratio("x", "Chest", "Waist")],
            None,
        );
        assert!(matches!(dup, Err(AppError::BadRequest(_))));

        let unnamed = normalize_ratios(vec![ratio("  ", "Waist", "Chest")], None);
        assert!(matches!(unnamed, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_normalize_override_keeps_ratios_without_measurements() {
        let over = GalleryConfig {
            unit_system: Some(UnitSystem::Metric),
            measurements: None,
            ratios: Some(vec![ratio("wc", "Waist", "Chest")]),
        };
        let over = normalize_override(over).unwrap();
        assert_eq!(over.ratios.unwrap().len(), 1);
    }

    #[test]
    fn test_blank_measurements() {
        let labels = vec!["Waist".to_string(), "Chest".to_string()];
        assert_eq!(
            blank_measurements(&labels),
            vec![m("Waist", None), m("Chest", None)]
        );
    }
}
