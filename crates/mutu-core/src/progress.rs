//! Completion percentages and achievement classification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rounds to two decimals and clamps into `0..=100`.
#[must_use]
pub fn percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    ((value.clamp(0.0, 100.0)) * 100.0).round() / 100.0
}

#[must_use]
pub fn ratio_percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    percent(part as f64 / whole as f64 * 100.0)
}

/// Whether a submitted value counts as filled in.
///
/// Null, blank strings, and empty collections are empty. Numbers and
/// booleans are filled, since `0` and `false` are real answers.
#[must_use]
pub fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Bool(_) | Value::Number(_)) => true,
    }
}

/// Completion for a submission without a dynamic form.
///
/// An explicit `is_complete = true` short-circuits to 100; otherwise the
/// share of required keys that are filled.
#[must_use]
pub fn required_field_completion(
    values: &Map<String, Value>,
    required: &[String],
    is_complete: Option<bool>,
) -> f64 {
    if is_complete == Some(true) {
        return 100.0;
    }
    let filled = required
        .iter()
        .filter(|field| is_filled(values.get(field.as_str())))
        .count();
    ratio_percent(filled, required.len())
}

string_enum! {
    /// Attention ladder used for indicator targets.
    pub enum AttentionStatus {
        Achieved => "achieved",
        OnTrack => "on_track",
        Warning => "warning",
        Critical => "critical",
    }
}

impl AttentionStatus {
    #[must_use]
    pub fn from_achievement(achievement: f64) -> Self {
        if achievement >= 100.0 {
            Self::Achieved
        } else if achievement >= 75.0 {
            Self::OnTrack
        } else if achievement >= 50.0 {
            Self::Warning
        } else {
            Self::Critical
        }
    }

    #[must_use]
    pub const fn needs_attention(self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }
}

/// Achievement of an actual value against its target, in percent.
///
/// Not clamped: over-achievement is reported as-is.
#[must_use]
pub fn achievement(actual: f64, target: f64) -> f64 {
    if target == 0.0 {
        return 0.0;
    }
    (actual / target * 100.0 * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub percentage: f64,
    pub status: AttentionStatus,
}

impl Achievement {
    #[must_use]
    pub fn measure(actual: f64, target: f64) -> Self {
        let percentage = achievement(actual, target);
        Self {
            percentage,
            status: AttentionStatus::from_achievement(percentage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn explicit_complete_short_circuits() {
        let values = obj(json!({}));
        let required = vec!["content".to_string()];
        assert!((required_field_completion(&values, &required, Some(true)) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn share_of_required_fields_rounded() {
        let values = obj(json!({"a": "x", "b": "", "c": null}));
        let required = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!((required_field_completion(&values, &required, None) - 33.33).abs() < 1e-9);
    }

    #[test]
    fn nothing_required_is_complete() {
        let values = obj(json!({}));
        assert!((required_field_completion(&values, &[], Some(false)) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn attention_ladder_thresholds() {
        assert_eq!(AttentionStatus::from_achievement(100.0), AttentionStatus::Achieved);
        assert_eq!(AttentionStatus::from_achievement(120.0), AttentionStatus::Achieved);
        assert_eq!(AttentionStatus::from_achievement(75.0), AttentionStatus::OnTrack);
        assert_eq!(AttentionStatus::from_achievement(74.99), AttentionStatus::Warning);
        assert_eq!(AttentionStatus::from_achievement(50.0), AttentionStatus::Warning);
        assert_eq!(AttentionStatus::from_achievement(49.9), AttentionStatus::Critical);
    }

    #[test]
    fn zero_target_has_no_achievement() {
        let measured = Achievement::measure(10.0, 0.0);
        assert!(measured.percentage.abs() < f64::EPSILON);
        assert_eq!(measured.status, AttentionStatus::Critical);
    }

    #[test]
    fn numbers_and_false_count_as_filled() {
        assert!(is_filled(Some(&json!(0))));
        assert!(is_filled(Some(&json!(false))));
        assert!(!is_filled(Some(&json!("   "))));
        assert!(!is_filled(Some(&json!([]))));
    }
}
