//! Completion percentage per form kind.
//!
//! Every formula treats "nothing required" as complete.

use serde_json::Value;

use super::config::{ChecklistItem, FieldDef, FormConfig};
use super::validator::is_checked;
use crate::progress::{is_filled, percent, ratio_percent};

/// Completion of `data` against `config`, in `0..=100`.
#[must_use]
pub fn calculate_completion(data: &Value, config: &FormConfig) -> f64 {
    match config {
        FormConfig::Table {
            columns, min_rows, ..
        } => table_completion(data, columns, *min_rows),
        FormConfig::Narrative { fields } => fields_completion(data, fields),
        FormConfig::Metric { metrics } => fields_completion(data, metrics),
        FormConfig::Checklist { items } => checklist_completion(data, items),
        FormConfig::Mixed { sections } => {
            if sections.is_empty() {
                return 100.0;
            }
            let total: f64 = sections
                .iter()
                .map(|section| {
                    let section_data = data.get(section.title.as_str()).unwrap_or(&Value::Null);
                    calculate_completion(section_data, &section.form)
                })
                .sum();
            percent(total / sections.len() as f64)
        }
    }
}

fn rows(data: &Value) -> &[Value] {
    data.get("rows")
        .and_then(Value::as_array)
        .or_else(|| data.as_array())
        .map_or(&[], Vec::as_slice)
}

fn table_completion(data: &Value, columns: &[FieldDef], min_rows: Option<usize>) -> f64 {
    let required: Vec<&str> = columns
        .iter()
        .filter(|c| c.required)
        .map(|c| c.name.as_str())
        .collect();
    if required.is_empty() {
        return 100.0;
    }

    let rows = rows(data);
    let minimum = min_rows.unwrap_or(1).max(1);
    let count_score = ratio_percent(rows.len().min(minimum), minimum);
    let complete_rows = rows
        .iter()
        .filter(|row| required.iter().all(|name| is_filled(row.get(*name))))
        .count();
    let row_score = if rows.is_empty() {
        0.0
    } else {
        ratio_percent(complete_rows, rows.len())
    };
    percent((count_score + row_score) / 2.0)
}

fn fields_completion(data: &Value, fields: &[FieldDef]) -> f64 {
    let required: Vec<&FieldDef> = fields.iter().filter(|f| f.required).collect();
    let filled = required
        .iter()
        .filter(|f| is_filled(data.get(f.name.as_str())))
        .count();
    ratio_percent(filled, required.len())
}

fn checklist_completion(data: &Value, items: &[ChecklistItem]) -> f64 {
    if !items.iter().any(|item| item.required) {
        return 100.0;
    }
    let done = items
        .iter()
        .filter(|item| data.get(item.name.as_str()).is_some_and(|v| item_done(item, v)))
        .count();
    ratio_percent(done, items.len())
}

/// Ticked, with its file attached when one is demanded.
fn item_done(item: &ChecklistItem, value: &Value) -> bool {
    is_checked(value) && (!item.file_required || is_filled(value.get("file")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::config::FieldType;
    use serde_json::json;

    fn close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn narrative_half_filled() {
        let config = FormConfig::Narrative {
            fields: vec![
                FieldDef::new("visi", FieldType::Textarea).required(),
                FieldDef::new("misi", FieldType::Textarea).required(),
                FieldDef::new("catatan", FieldType::Text),
            ],
        };
        close(
            calculate_completion(&json!({"visi": "Unggul", "misi": "", "catatan": "x"}), &config),
            50.0,
        );
    }

    #[test]
    fn nothing_required_is_complete() {
        let config = FormConfig::Metric {
            metrics: vec![FieldDef::new("ipk", FieldType::Number)],
        };
        close(calculate_completion(&json!({}), &config), 100.0);

        let table = FormConfig::Table {
            columns: vec![FieldDef::new("nama", FieldType::Text)],
            min_rows: Some(5),
            max_rows: None,
        };
        close(calculate_completion(&json!({"rows": []}), &table), 100.0);
    }

    #[test]
    fn table_averages_row_count_and_row_completeness() {
        let config = FormConfig::Table {
            columns: vec![
                FieldDef::new("nama", FieldType::Text).required(),
                FieldDef::new("nidn", FieldType::Text).required(),
            ],
            min_rows: Some(4),
            max_rows: None,
        };
        // 2 of 4 rows present (50), 1 of 2 complete (50)
        let data = json!({"rows": [
            {"nama": "Ani", "nidn": "001"},
            {"nama": "Budi", "nidn": ""}
        ]});
        close(calculate_completion(&data, &config), 50.0);

        let full = json!({"rows": [
            {"nama": "A", "nidn": "1"}, {"nama": "B", "nidn": "2"},
            {"nama": "C", "nidn": "3"}, {"nama": "D", "nidn": "4"},
            {"nama": "E", "nidn": "5"}
        ]});
        close(calculate_completion(&full, &config), 100.0);
        close(calculate_completion(&json!({}), &config), 0.0);
    }

    #[test]
    fn checklist_counts_checked_items() {
        let config: FormConfig = serde_json::from_value(json!({
            "type": "checklist",
            "items": [{"name": "a"}, {"name": "b"}, {"name": "c", "required": false}]
        }))
        .unwrap();
        let data = json!({"a": {"checked": true}, "b": false, "c": true});
        close(calculate_completion(&data, &config), 66.67);
    }

    #[test]
    fn checklist_item_without_required_file_is_not_done() {
        let config: FormConfig = serde_json::from_value(json!({
            "type": "checklist",
            "items": [{"name": "sk", "file_required": true}, {"name": "renstra"}]
        }))
        .unwrap();
        close(calculate_completion(&json!({"sk": true, "renstra": true}), &config), 50.0);
        let data = json!({"sk": {"checked": true, "file": "docs/sk.pdf"}, "renstra": "1"});
        close(calculate_completion(&data, &config), 100.0);
    }

    #[test]
    fn mixed_is_mean_of_sections() {
        let config: FormConfig = serde_json::from_value(json!({
            "type": "mixed",
            "sections": [
                {"title": "Profil", "type": "narrative", "fields": [{"name": "visi", "required": true}]},
                {"title": "Data", "type": "metric", "metrics": [
                    {"name": "a", "type": "number", "required": true},
                    {"name": "b", "type": "number", "required": true}
                ]}
            ]
        }))
        .unwrap();
        let data = json!({"Profil": {"visi": "ok"}, "Data": {"a": 3}});
        close(calculate_completion(&data, &config), 75.0);
    }

    #[test]
    fn always_within_bounds() {
        let config = FormConfig::Table {
            columns: vec![FieldDef::new("x", FieldType::Number).required()],
            min_rows: Some(1),
            max_rows: None,
        };
        for data in [
            json!(null),
            json!("text"),
            json!({"rows": "not a list"}),
            json!([{"x": 1}, {"x": 2}, {"x": null}]),
        ] {
            let value = calculate_completion(&data, &config);
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
