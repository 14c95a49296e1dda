//! Rule generation and checking for dynamic criterion forms.
//!
//! Rules are derived from the same `FormConfig` the completion formulas
//! use, so the field taxonomy stays in one place.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::config::{FieldDef, FieldType, FormConfig};
use crate::error::ValidationErrors;
use crate::models::Criterion;
use crate::progress::is_filled;
use crate::Result;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|_| unreachable!())
});

/// Default length cap for single-line text fields.
const TEXT_MAX_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    /// Every element of an array
    Each,
}

/// Location of a value inside form data, e.g. `rows.*.nama_dosen`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn key(key: impl Into<String>) -> Self {
        Self(vec![PathSegment::Key(key.into())])
    }

    #[must_use]
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    #[must_use]
    pub fn each(&self) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Each);
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Concrete locations this path matches in `data`, with the value found
    /// there (`None` when absent).
    pub fn resolve<'a>(&self, data: &'a Value) -> Vec<(String, Option<&'a Value>)> {
        let mut found = Vec::new();
        resolve_into(&self.0, Some(data), String::new(), &mut found);
        found
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn resolve_into<'a>(
    segments: &[PathSegment],
    current: Option<&'a Value>,
    location: String,
    found: &mut Vec<(String, Option<&'a Value>)>,
) {
    let Some((head, rest)) = segments.split_first() else {
        found.push((location, current));
        return;
    };
    match head {
        PathSegment::Key(key) => {
            let next = current.and_then(|v| v.get(key.as_str()));
            resolve_into(rest, next, join(&location, key), found);
        }
        PathSegment::Each => {
            if let Some(items) = current.and_then(Value::as_array) {
                for (index, item) in items.iter().enumerate() {
                    resolve_into(rest, Some(item), join(&location, &index.to_string()), found);
                }
            }
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(key) => f.write_str(key)?,
                PathSegment::Each => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    Required,
    Nullable,
    String,
    MinLength(usize),
    MaxLength(usize),
    Numeric,
    Min(f64),
    Max(f64),
    In(Vec<String>),
    Date,
    Email,
    Url,
    Boolean,
    /// Checkbox must be ticked
    Accepted,
    /// A bare boolean or `{checked, file}`
    Checkbox,
    Regex(String),
    Array,
    MinItems(usize),
    MaxItems(usize),
}

impl Constraint {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Nullable => "nullable",
            Self::String => "string",
            Self::MinLength(_) => "min_length",
            Self::MaxLength(_) => "max_length",
            Self::Numeric => "numeric",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::In(_) => "in",
            Self::Date => "date",
            Self::Email => "email",
            Self::Url => "url",
            Self::Boolean => "boolean",
            Self::Accepted => "accepted",
            Self::Checkbox => "checkbox",
            Self::Regex(_) => "regex",
            Self::Array => "array",
            Self::MinItems(_) => "min_items",
            Self::MaxItems(_) => "max_items",
        }
    }

    /// Whether a present (non-empty) value satisfies this constraint.
    fn holds(&self, value: &Value) -> bool {
        match self {
            Self::Required | Self::Nullable => true,
            Self::String => value.is_string(),
            Self::MinLength(n) => value.as_str().is_none_or(|s| s.chars().count() >= *n),
            Self::MaxLength(n) => value.as_str().is_none_or(|s| s.chars().count() <= *n),
            Self::Numeric => as_number(value).is_some(),
            Self::Min(min) => as_number(value).is_none_or(|n| n >= *min),
            Self::Max(max) => as_number(value).is_none_or(|n| n <= *max),
            Self::In(keys) => scalar_text(value).is_some_and(|s| keys.contains(&s)),
            Self::Date => value.as_str().is_some_and(is_date),
            Self::Email => value.as_str().is_some_and(|s| EMAIL.is_match(s)),
            Self::Url => value.as_str().is_some_and(|s| {
                url::Url::parse(s).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
            }),
            Self::Boolean => is_boolean(value),
            Self::Accepted => is_checked(value),
            Self::Checkbox => match value {
                Value::Object(map) => map.get("checked").is_none_or(|c| c.is_null() || is_boolean(c)),
                other => is_boolean(other),
            },
            Self::Regex(pattern) => scalar_text(value).is_some_and(|s| {
                Regex::new(pattern).is_ok_and(|re| re.is_match(&s))
            }),
            Self::Array => value.is_array(),
            Self::MinItems(n) => value.as_array().is_none_or(|a| a.len() >= *n),
            Self::MaxItems(n) => value.as_array().is_none_or(|a| a.len() <= *n),
        }
    }

    fn message(&self, label: &str) -> String {
        match self {
            Self::Required => format!("{label} is required"),
            Self::Nullable => format!("{label} is optional"),
            Self::String => format!("{label} must be text"),
            Self::MinLength(n) => format!("{label} must be at least {n} characters"),
            Self::MaxLength(n) => format!("{label} may not exceed {n} characters"),
            Self::Numeric => format!("{label} must be a number"),
            Self::Min(n) => format!("{label} must be at least {n}"),
            Self::Max(n) => format!("{label} may not be greater than {n}"),
            Self::In(keys) => format!("{label} must be one of: {}", keys.join(", ")),
            Self::Date => format!("{label} must be a valid date"),
            Self::Email => format!("{label} must be a valid e-mail address"),
            Self::Url => format!("{label} must be a valid URL"),
            Self::Boolean => format!("{label} must be true or false"),
            Self::Accepted => format!("{label} must be checked"),
            Self::Checkbox => format!("{label} must be a checkbox value"),
            Self::Regex(_) => format!("{label} has an invalid format"),
            Self::Array => format!("{label} must be a list"),
            Self::MinItems(n) => format!("{label} needs at least {n} rows"),
            Self::MaxItems(n) => format!("{label} may not have more than {n} rows"),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0 | 1)),
        Value::String(s) => matches!(s.as_str(), "0" | "1" | "true" | "false"),
        _ => false,
    }
}

/// Checkbox semantics, also used by checklist completion.
pub(crate) fn is_checked(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.as_str(), "1" | "true" | "yes" | "on"),
        Value::Object(map) => map.get("checked").is_some_and(is_checked),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub path: FieldPath,
    pub constraints: Vec<Constraint>,
}

/// Rules plus the message for each `path.rule` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub messages: BTreeMap<String, String>,
}

impl RuleSet {
    fn push(&mut self, path: FieldPath, label: &str, constraints: Vec<Constraint>) {
        for constraint in &constraints {
            if matches!(constraint, Constraint::Nullable) {
                continue;
            }
            self.messages
                .insert(format!("{path}.{}", constraint.name()), constraint.message(label));
        }
        self.rules.push(Rule { path, constraints });
    }

    pub fn rule(&self, path: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.path.to_string() == path)
    }

    /// Applies every rule to `data`, collecting all failures.
    pub fn check(&self, data: &Value) -> Result<()> {
        let mut errors = ValidationErrors::new();
        for rule in &self.rules {
            let pattern = rule.path.to_string();
            for (location, value) in rule.path.resolve(data) {
                for constraint in failures(&rule.constraints, value) {
                    let key = format!("{pattern}.{}", constraint.name());
                    let message = self
                        .messages
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| constraint.message(&location));
                    errors.add(location.clone(), message);
                }
            }
        }
        errors.into_result()
    }
}

fn failures<'c>(constraints: &'c [Constraint], value: Option<&Value>) -> Vec<&'c Constraint> {
    // `false` is a present value for booleans but an unticked checkbox
    // for `accepted`, which is handled by the constraint itself.
    let present = is_filled(value);
    match value {
        Some(value) if present => constraints.iter().filter(|c| !c.holds(value)).collect(),
        _ => constraints
            .iter()
            .filter(|c| matches!(c, Constraint::Required))
            .collect(),
    }
}

fn field_constraints(field: &FieldDef) -> Vec<Constraint> {
    let mut constraints = vec![if field.required {
        Constraint::Required
    } else {
        Constraint::Nullable
    }];
    match field.field_type {
        FieldType::Text => {
            constraints.push(Constraint::String);
            if let Some(min) = field.min_length {
                constraints.push(Constraint::MinLength(min));
            }
            constraints.push(Constraint::MaxLength(
                field.max_length.unwrap_or(TEXT_MAX_LENGTH),
            ));
        }
        FieldType::Textarea => {
            constraints.push(Constraint::String);
            if let Some(min) = field.min_length {
                constraints.push(Constraint::MinLength(min));
            }
            if let Some(max) = field.max_length {
                constraints.push(Constraint::MaxLength(max));
            }
        }
        FieldType::Number => {
            constraints.push(Constraint::Numeric);
            if let Some(min) = field.min {
                constraints.push(Constraint::Min(min));
            }
            if let Some(max) = field.max {
                constraints.push(Constraint::Max(max));
            }
        }
        FieldType::Currency | FieldType::Decimal => {
            constraints.push(Constraint::Numeric);
            constraints.push(Constraint::Min(field.min.unwrap_or(0.0).max(0.0)));
            if let Some(max) = field.max {
                constraints.push(Constraint::Max(max));
            }
        }
        FieldType::Select => constraints.push(Constraint::In(field.option_keys())),
        FieldType::Date => constraints.push(Constraint::Date),
        FieldType::Email => constraints.push(Constraint::Email),
        FieldType::Url => constraints.push(Constraint::Url),
        FieldType::Boolean => constraints.push(Constraint::Boolean),
        FieldType::Percentage => {
            constraints.push(Constraint::Numeric);
            constraints.push(Constraint::Min(0.0));
            constraints.push(Constraint::Max(100.0));
        }
        FieldType::File => constraints.push(Constraint::String),
    }
    if let Some(pattern) = &field.regex {
        constraints.push(Constraint::Regex(pattern.clone()));
    }
    constraints
}

fn collect(config: &FormConfig, base: &FieldPath, out: &mut RuleSet) {
    let at = |name: &str| {
        if base.segments().is_empty() {
            FieldPath::key(name)
        } else {
            base.child(name)
        }
    };
    match config {
        FormConfig::Table {
            columns,
            min_rows,
            max_rows,
        } => {
            let rows = at("rows");
            let mut row_rules = vec![
                if min_rows.is_some_and(|n| n > 0) {
                    Constraint::Required
                } else {
                    Constraint::Nullable
                },
                Constraint::Array,
            ];
            if let Some(min) = min_rows {
                row_rules.push(Constraint::MinItems(*min));
            }
            if let Some(max) = max_rows {
                row_rules.push(Constraint::MaxItems(*max));
            }
            out.push(rows.clone(), "rows", row_rules);
            let each = rows.each();
            for column in columns {
                out.push(
                    each.child(&column.name),
                    column.display_label(),
                    field_constraints(column),
                );
            }
        }
        FormConfig::Narrative { fields: defs } | FormConfig::Metric { metrics: defs } => {
            for field in defs {
                out.push(at(&field.name), field.display_label(), field_constraints(field));
            }
        }
        FormConfig::Checklist { items } => {
            for item in items {
                let item_path = at(&item.name);
                let constraints = if item.required {
                    vec![Constraint::Required, Constraint::Accepted]
                } else {
                    vec![Constraint::Nullable, Constraint::Checkbox]
                };
                out.push(item_path.clone(), item.display_label(), constraints);
                if item.file_required {
                    let label = format!("{} file", item.display_label());
                    out.push(
                        item_path.child("file"),
                        &label,
                        vec![Constraint::Required, Constraint::String],
                    );
                }
            }
        }
        FormConfig::Mixed { sections } => {
            for section in sections {
                collect(&section.form, &at(&section.title), out);
            }
        }
    }
}

/// Builds and applies validation rules from a criterion's `form_config`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicFormValidator;

impl DynamicFormValidator {
    pub fn rules(config: &FormConfig) -> RuleSet {
        let mut rules = RuleSet::default();
        collect(config, &FieldPath::default(), &mut rules);
        rules
    }

    /// Validates `form_data` against the criterion's form. A criterion
    /// without a form yields an empty rule set.
    pub fn validate(form_data: &Value, criterion: &Criterion) -> Result<RuleSet> {
        let Some(config) = criterion.form_config() else {
            return Ok(RuleSet::default());
        };
        let rules = Self::rules(config);
        rules.check(form_data)?;
        Ok(rules)
    }

    pub fn calculate_completion(form_data: &Value, config: &FormConfig) -> f64 {
        super::completion::calculate_completion(form_data, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::config::FieldOptions;
    use crate::Error;
    use serde_json::json;

    fn errors_of(result: Result<()>) -> ValidationErrors {
        match result {
            Err(Error::Validation(errors)) => errors,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(()) => panic!("expected validation failure"),
        }
    }

    fn table() -> FormConfig {
        let mut jabatan = FieldDef::new("jabatan", FieldType::Select);
        jabatan.options = Some(FieldOptions::Listed(vec![
            crate::form::config::OptionEntry::Plain("lektor".to_string()),
            crate::form::config::OptionEntry::Plain("asisten_ahli".to_string()),
        ]));
        FormConfig::Table {
            columns: vec![
                FieldDef::new("nama", FieldType::Text).required().with_label("Nama"),
                jabatan,
                FieldDef::new("persen", FieldType::Percentage),
            ],
            min_rows: Some(1),
            max_rows: Some(3),
        }
    }

    #[test]
    fn field_type_rule_mapping() {
        let rules = DynamicFormValidator::rules(&table());
        assert_eq!(
            rules.rule("rows.*.nama").unwrap().constraints,
            vec![
                Constraint::Required,
                Constraint::String,
                Constraint::MaxLength(255)
            ]
        );
        assert_eq!(
            rules.rule("rows.*.persen").unwrap().constraints,
            vec![
                Constraint::Nullable,
                Constraint::Numeric,
                Constraint::Min(0.0),
                Constraint::Max(100.0)
            ]
        );
        assert_eq!(rules.messages["rows.*.nama.required"], "Nama is required");
    }

    #[test]
    fn table_rows_checked_per_row() {
        let rules = DynamicFormValidator::rules(&table());
        let errors = errors_of(rules.check(&json!({
            "rows": [
                {"nama": "Ani", "jabatan": "lektor", "persen": 50},
                {"nama": "", "jabatan": "profesor", "persen": 150}
            ]
        })));
        assert!(errors.contains("rows.1.nama"));
        assert!(errors.contains("rows.1.jabatan"));
        assert!(errors.contains("rows.1.persen"));
        assert!(!errors.contains("rows.0.nama"));
    }

    #[test]
    fn table_row_count_limits() {
        let rules = DynamicFormValidator::rules(&table());
        let errors = errors_of(rules.check(&json!({"rows": []})));
        assert!(errors.contains("rows"));

        let row = json!({"nama": "A"});
        let errors = errors_of(rules.check(&json!({"rows": [row, row, row, row]})));
        assert_eq!(
            errors.get("rows").unwrap(),
            &["rows may not have more than 3 rows".to_string()]
        );
    }

    #[test]
    fn checklist_requires_ticks_and_files() {
        let config: FormConfig = serde_json::from_value(json!({
            "type": "checklist",
            "items": [
                {"name": "sk_rektor", "label": "SK Rektor", "file_required": true},
                {"name": "opsional", "required": false}
            ]
        }))
        .unwrap();
        let rules = DynamicFormValidator::rules(&config);

        let errors = errors_of(rules.check(&json!({"sk_rektor": {"checked": false}})));
        assert!(errors.contains("sk_rektor"));
        assert!(errors.contains("sk_rektor.file"));

        let errors = errors_of(rules.check(&json!({"sk_rektor": true, "opsional": "maybe"})));
        assert!(!errors.contains("sk_rektor"));
        assert!(errors.contains("sk_rektor.file"));
        assert!(errors.contains("opsional"));

        assert!(rules
            .check(&json!({"sk_rektor": {"checked": true, "file": "docs/sk.pdf"}}))
            .is_ok());
    }

    #[test]
    fn mixed_sections_are_namespaced() {
        let config: FormConfig = serde_json::from_value(json!({
            "type": "mixed",
            "sections": [
                {"title": "Profil", "type": "narrative", "fields": [
                    {"name": "visi", "required": true},
                    {"name": "website", "type": "url"}
                ]},
                {"title": "Capaian", "type": "metric", "metrics": [
                    {"name": "ipk", "type": "number", "min": 0, "max": 4, "required": true}
                ]}
            ]
        }))
        .unwrap();
        let rules = DynamicFormValidator::rules(&config);
        assert!(rules.rule("Profil.visi").is_some());
        assert!(rules.messages.contains_key("Capaian.ipk.max"));

        let errors = errors_of(rules.check(&json!({
            "Profil": {"visi": "Unggul", "website": "ftp://example.org"},
            "Capaian": {"ipk": 4.5}
        })));
        assert!(errors.contains("Profil.website"));
        assert!(errors.contains("Capaian.ipk"));
        assert!(!errors.contains("Profil.visi"));
    }

    #[test]
    fn optional_empty_fields_are_skipped() {
        let config = FormConfig::Narrative {
            fields: vec![FieldDef::new("email", FieldType::Email)],
        };
        let rules = DynamicFormValidator::rules(&config);
        assert!(rules.check(&json!({"email": ""})).is_ok());
        assert!(rules.check(&json!({"email": "bukan-email"})).is_err());
        assert!(rules.check(&json!({"email": "lpm@kampus.ac.id"})).is_ok());
    }

    #[test]
    fn regex_constraint_applies() {
        let mut nidn = FieldDef::new("nidn", FieldType::Text).required();
        nidn.regex = Some(r"^\d{10}$".to_string());
        let rules = DynamicFormValidator::rules(&FormConfig::Narrative { fields: vec![nidn] });
        assert!(rules.check(&json!({"nidn": "0012345678"})).is_ok());
        assert!(rules.check(&json!({"nidn": "12ab"})).is_err());
    }
}
