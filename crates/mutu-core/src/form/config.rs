use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

string_enum! {
    pub enum FieldType {
        Text => "text",
        Textarea => "textarea",
        Number => "number",
        Currency => "currency",
        Decimal => "decimal",
        Select => "select",
        Date => "date",
        Email => "email",
        Url => "url",
        Boolean => "boolean",
        Percentage => "percentage",
        /// Stored file reference
        File => "file",
    }
}

impl Default for FieldType {
    fn default() -> Self {
        Self::Text
    }
}

impl FieldType {
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Number | Self::Currency | Self::Decimal | Self::Percentage
        )
    }
}

/// Select options, either `{"key": "Label"}` or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldOptions {
    Keyed(BTreeMap<String, String>),
    Listed(Vec<OptionEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionEntry {
    Plain(String),
    Labeled {
        value: String,
        #[serde(default)]
        label: Option<String>,
    },
}

impl FieldOptions {
    /// The accepted stored values.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Self::Keyed(map) => map.keys().cloned().collect(),
            Self::Listed(entries) => entries
                .iter()
                .map(|entry| match entry {
                    OptionEntry::Plain(value) | OptionEntry::Labeled { value, .. } => {
                        value.clone()
                    }
                })
                .collect(),
        }
    }
}

/// One named field of a table column, narrative field, or metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: None,
            field_type,
            required: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            options: None,
            regex: None,
            prefix: None,
            suffix: None,
            format: None,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label for messages, falling back to the field name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn option_keys(&self) -> Vec<String> {
        self.options.as_ref().map(FieldOptions::keys).unwrap_or_default()
    }
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub file_required: bool,
}

impl ChecklistItem {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A titled sub-form of a mixed form. Its data lives under `title`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(flatten)]
    pub form: Box<FormConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormConfig {
    /// Repeating rows; data is `{"rows": [{column: value}, ...]}`
    Table {
        columns: Vec<FieldDef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_rows: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_rows: Option<usize>,
    },
    /// Data is `{field: value}`
    Narrative { fields: Vec<FieldDef> },
    /// Data is `{item: bool}` or `{item: {"checked": bool, "file": "path"}}`
    Checklist { items: Vec<ChecklistItem> },
    /// Data is `{metric: value}`
    Metric { metrics: Vec<FieldDef> },
    /// Data is `{section title: section data}`
    Mixed { sections: Vec<Section> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Table,
    Narrative,
    Checklist,
    Metric,
    Mixed,
}

impl FormConfig {
    pub const fn kind(&self) -> FormKind {
        match self {
            Self::Table { .. } => FormKind::Table,
            Self::Narrative { .. } => FormKind::Narrative,
            Self::Checklist { .. } => FormKind::Checklist,
            Self::Metric { .. } => FormKind::Metric,
            Self::Mixed { .. } => FormKind::Mixed,
        }
    }

    /// Fields that are stored column-wise in `butir_data`: table columns,
    /// narrative fields, or metrics. Checklists and mixed forms have none.
    pub fn storable_fields(&self) -> &[FieldDef] {
        match self {
            Self::Table { columns, .. } => columns,
            Self::Narrative { fields } => fields,
            Self::Metric { metrics } => metrics,
            Self::Checklist { .. } | Self::Mixed { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_table_config() {
        let config: FormConfig = serde_json::from_value(json!({
            "type": "table",
            "min_rows": 1,
            "columns": [
                {"name": "nama_dosen", "label": "Nama Dosen", "type": "text", "required": true},
                {"name": "jabatan", "type": "select", "options": {"lektor": "Lektor", "guru_besar": "Guru Besar"}}
            ]
        }))
        .unwrap();
        assert_eq!(config.kind(), FormKind::Table);
        let fields = config.storable_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].option_keys(), vec!["guru_besar", "lektor"]);
    }

    #[test]
    fn parses_nested_mixed_sections() {
        let config: FormConfig = serde_json::from_value(json!({
            "type": "mixed",
            "sections": [
                {"title": "Profil", "type": "narrative", "fields": [{"name": "visi", "required": true}]},
                {"title": "Dokumen", "type": "checklist", "items": [{"name": "sk", "file_required": true}]}
            ]
        }))
        .unwrap();
        let FormConfig::Mixed { sections } = config else {
            panic!("expected mixed form");
        };
        assert_eq!(sections[0].form.kind(), FormKind::Narrative);
        let FormConfig::Checklist { items } = sections[1].form.as_ref() else {
            panic!("expected checklist section");
        };
        assert!(items[0].required);
        assert!(items[0].file_required);
    }

    #[test]
    fn unknown_form_type_is_rejected() {
        let parsed: Result<FormConfig, _> =
            serde_json::from_value(json!({"type": "wizard", "steps": []}));
        assert!(parsed.is_err());
    }

    #[test]
    fn listed_options_accept_plain_and_labeled() {
        let options: FieldOptions =
            serde_json::from_value(json!(["a", {"value": "b", "label": "B"}])).unwrap();
        assert_eq!(options.keys(), vec!["a", "b"]);
    }
}
