//! Field to generic column bindings for `butir_data`.
//!
//! A criterion's named fields are bound to the physical slots `c1..c30`.
//! The binding set is versioned: every rebinding bumps the criterion's
//! mapping version, and each data row records the version it was last
//! written under.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use super::config::{FieldDef, FieldType};
use crate::storage::{self, Storage};
use crate::{Error, Result};

pub const MAX_MAPPED_FIELDS: usize = 30;

const COLUMN_NAMES: [&str; MAX_MAPPED_FIELDS] = [
    "c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8", "c9", "c10", "c11", "c12", "c13", "c14",
    "c15", "c16", "c17", "c18", "c19", "c20", "c21", "c22", "c23", "c24", "c25", "c26", "c27",
    "c28", "c29", "c30",
];

/// One of the generic value columns `c1..c30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnSlot(u8);

impl ColumnSlot {
    /// Slot for a 1-based position.
    pub fn new(position: usize) -> Option<Self> {
        if (1..=MAX_MAPPED_FIELDS).contains(&position) {
            u8::try_from(position).ok().map(Self)
        } else {
            None
        }
    }

    pub fn parse(column_name: &str) -> Option<Self> {
        column_name
            .strip_prefix('c')
            .and_then(|n| n.parse().ok())
            .and_then(Self::new)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (1..=MAX_MAPPED_FIELDS).filter_map(Self::new)
    }

    pub const fn position(self) -> usize {
        self.0 as usize
    }

    pub const fn column_name(self) -> &'static str {
        COLUMN_NAMES[self.0 as usize - 1]
    }
}

impl fmt::Display for ColumnSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl Serialize for ColumnSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.column_name())
    }
}

/// Display and validation metadata persisted with a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct FieldConfig {
    pub label: String,
    pub required: bool,
    #[serde(default)]
    pub validation: Map<String, Value>,
}

impl FieldConfig {
    /// Keeps only the recognized per-type constraint keys.
    pub fn from_def(def: &FieldDef) -> Result<Self> {
        let mut validation = Map::new();
        let mut put = |key: &str, value: Value| {
            if !value.is_null() {
                validation.insert(key.to_string(), value);
            }
        };
        put("min", serde_json::to_value(def.min)?);
        put("max", serde_json::to_value(def.max)?);
        put("min_length", serde_json::to_value(def.min_length)?);
        put("max_length", serde_json::to_value(def.max_length)?);
        put("regex", serde_json::to_value(&def.regex)?);
        put("options", serde_json::to_value(&def.options)?);
        put("prefix", serde_json::to_value(&def.prefix)?);
        put("suffix", serde_json::to_value(&def.suffix)?);
        put("format", serde_json::to_value(&def.format)?);
        Ok(Self {
            label: def.display_label().to_string(),
            required: def.required,
            validation,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMapping {
    pub id: Uuid,
    pub criterion_id: Uuid,
    pub version: i64,
    pub field_name: String,
    pub column: ColumnSlot,
    pub field_type: FieldType,
    pub field_config: FieldConfig,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

string_enum! {
    /// What happens to existing data rows when a criterion is rebound.
    pub enum MigrationPolicy {
        /// Raw values stay in their slots and are read under the new names
        Reinterpret => "reinterpret",
        /// Values follow their field name to its new slot; dropped fields are cleared
        RemapByName => "remap_by_name",
        Reject => "reject",
    }
}

/// The current binding set of one criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMappingSchema {
    pub criterion_id: Uuid,
    pub version: i64,
    pub mappings: Vec<ColumnMapping>,
}

impl ColumnMappingSchema {
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn column_for(&self, field: &str) -> Result<ColumnSlot> {
        self.mappings
            .iter()
            .find(|m| m.field_name == field)
            .map(|m| m.column)
            .ok_or_else(|| Error::FieldNotMapped {
                criterion_id: self.criterion_id,
                field: field.to_string(),
            })
    }

    pub fn field_for(&self, column: ColumnSlot) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.column == column)
            .map(|m| m.field_name.as_str())
    }

    /// `field_name -> column_name`
    pub fn dictionary(&self) -> BTreeMap<String, String> {
        self.mappings
            .iter()
            .map(|m| (m.field_name.clone(), m.column.column_name().to_string()))
            .collect()
    }

    /// `column_name -> field_name`
    pub fn reverse_dictionary(&self) -> BTreeMap<String, String> {
        self.mappings
            .iter()
            .map(|m| (m.column.column_name().to_string(), m.field_name.clone()))
            .collect()
    }

    /// Translates named values into slot values.
    pub fn encode(&self, values: &Map<String, Value>) -> Result<BTreeMap<ColumnSlot, Value>> {
        values
            .iter()
            .map(|(field, value)| Ok((self.column_for(field)?, value.clone())))
            .collect()
    }

    /// Translates slot values back into named values. Slots without a
    /// current binding are dropped.
    pub fn decode(&self, columns: &BTreeMap<ColumnSlot, Value>) -> Map<String, Value> {
        self.mappings
            .iter()
            .map(|m| {
                let value = columns.get(&m.column).cloned().unwrap_or(Value::Null);
                (m.field_name.clone(), value)
            })
            .collect()
    }
}

/// Assigns slots in declaration order.
pub(crate) fn plan_mappings(
    criterion_id: Uuid,
    version: i64,
    fields: &[FieldDef],
) -> Result<Vec<ColumnMapping>> {
    if fields.len() > MAX_MAPPED_FIELDS {
        return Err(Error::CapacityExceeded {
            limit: MAX_MAPPED_FIELDS,
            requested: fields.len(),
        });
    }

    let mut seen = std::collections::HashSet::new();
    let now = Utc::now();
    let mut mappings = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        let name = field.name.trim();
        if name.is_empty() {
            return Err(Error::validation(
                format!("fields.{index}.name"),
                "field name is required",
            ));
        }
        if !seen.insert(name) {
            return Err(Error::validation(
                format!("fields.{index}.name"),
                format!("field '{name}' is declared twice"),
            ));
        }
        let column = ColumnSlot::new(index + 1).ok_or(Error::CapacityExceeded {
            limit: MAX_MAPPED_FIELDS,
            requested: fields.len(),
        })?;
        mappings.push(ColumnMapping {
            id: Uuid::new_v4(),
            criterion_id,
            version,
            field_name: name.to_string(),
            column,
            field_type: field.field_type,
            field_config: FieldConfig::from_def(field)?,
            display_order: i64::try_from(index).unwrap_or(i64::MAX),
            created_at: now,
        });
    }
    Ok(mappings)
}

/// Slot values of a row rewritten from `old` bindings to `new` ones,
/// following field names.
pub(crate) fn remap_columns(
    columns: &BTreeMap<ColumnSlot, Value>,
    old: &ColumnMappingSchema,
    new: &[ColumnMapping],
) -> BTreeMap<ColumnSlot, Value> {
    new.iter()
        .filter_map(|mapping| {
            let previous = old.column_for(&mapping.field_name).ok()?;
            let value = columns.get(&previous)?;
            Some((mapping.column, value.clone()))
        })
        .collect()
}

/// Creates, rebinds, and reads criterion column mappings.
#[derive(Clone)]
pub struct ButirMappingService {
    storage: Storage,
}

impl ButirMappingService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Binds `fields` for a criterion that has no mappings yet. Either every
    /// field is bound or none is.
    pub async fn setup_mappings(
        &self,
        criterion_id: Uuid,
        fields: &[FieldDef],
    ) -> Result<Vec<ColumnMapping>> {
        let mut tx = self.storage.begin().await?;
        storage::criterion::get(&mut tx, criterion_id).await?;

        let current = storage::mapping::load_schema(&mut tx, criterion_id).await?;
        if !current.is_empty() {
            return Err(Error::structural(format!(
                "criterion {criterion_id} already has column mappings; rebind them with an explicit migration policy"
            )));
        }

        let version = current.version + 1;
        let mappings = plan_mappings(criterion_id, version, fields)?;
        for mapping in &mappings {
            storage::mapping::insert(&mut tx, mapping).await?;
        }
        storage::mapping::set_version(&mut tx, criterion_id, version).await?;
        tx.commit().await?;

        info!(%criterion_id, version, fields = mappings.len(), "Column mappings created");
        Ok(mappings)
    }

    /// Binds the column-stored fields declared in the criterion's form.
    pub async fn setup_from_form_config(&self, criterion_id: Uuid) -> Result<Vec<ColumnMapping>> {
        let fields = self.form_fields(criterion_id).await?;
        self.setup_mappings(criterion_id, &fields).await
    }

    /// Replaces a criterion's bindings, migrating existing rows per `policy`.
    pub async fn update_mappings(
        &self,
        criterion_id: Uuid,
        fields: &[FieldDef],
        policy: MigrationPolicy,
    ) -> Result<Vec<ColumnMapping>> {
        let mut tx = self.storage.begin().await?;
        storage::criterion::get(&mut tx, criterion_id).await?;

        let old = storage::mapping::load_schema(&mut tx, criterion_id).await?;
        let version = old.version + 1;
        let mappings = plan_mappings(criterion_id, version, fields)?;
        let rows = storage::butir_data::count_for_criterion(&mut tx, criterion_id).await?;

        if rows > 0 && policy == MigrationPolicy::Reject {
            return Err(Error::structural(format!(
                "criterion {criterion_id} has {rows} data rows bound to mapping version {}",
                old.version
            )));
        }

        storage::mapping::delete_for_criterion(&mut tx, criterion_id).await?;
        for mapping in &mappings {
            storage::mapping::insert(&mut tx, mapping).await?;
        }

        match policy {
            MigrationPolicy::Reinterpret | MigrationPolicy::Reject => {
                storage::butir_data::retag_version(&mut tx, criterion_id, version).await?;
            }
            MigrationPolicy::RemapByName => {
                for mut row in storage::butir_data::list_for_criterion(&mut tx, criterion_id).await? {
                    row.columns = remap_columns(&row.columns, &old, &mappings);
                    row.mapping_version = version;
                    storage::butir_data::update(&mut tx, &row).await?;
                }
            }
        }
        storage::mapping::set_version(&mut tx, criterion_id, version).await?;
        tx.commit().await?;

        info!(
            %criterion_id,
            from_version = old.version,
            to_version = version,
            %policy,
            rows,
            "Column mappings rebound"
        );
        Ok(mappings)
    }

    pub async fn update_from_form_config(
        &self,
        criterion_id: Uuid,
        policy: MigrationPolicy,
    ) -> Result<Vec<ColumnMapping>> {
        let fields = self.form_fields(criterion_id).await?;
        self.update_mappings(criterion_id, &fields, policy).await
    }

    pub async fn schema(&self, criterion_id: Uuid) -> Result<ColumnMappingSchema> {
        let mut conn = self.storage.acquire().await?;
        storage::mapping::load_schema(&mut conn, criterion_id).await
    }

    pub async fn mappings_dictionary(&self, criterion_id: Uuid) -> Result<BTreeMap<String, String>> {
        Ok(self.schema(criterion_id).await?.dictionary())
    }

    pub async fn reverse_mappings_dictionary(
        &self,
        criterion_id: Uuid,
    ) -> Result<BTreeMap<String, String>> {
        Ok(self.schema(criterion_id).await?.reverse_dictionary())
    }

    async fn form_fields(&self, criterion_id: Uuid) -> Result<Vec<FieldDef>> {
        let mut conn = self.storage.acquire().await?;
        let criterion = storage::criterion::get(&mut conn, criterion_id).await?;
        let Some(config) = criterion.form_config() else {
            return Err(Error::validation(
                "metadata.form_config",
                "criterion has no form_config",
            ));
        };
        let fields = config.storable_fields();
        if fields.is_empty() {
            return Err(Error::validation(
                "metadata.form_config",
                format!("a {:?} form has no column-stored fields", config.kind()),
            ));
        }
        Ok(fields.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn migration_policy_parses_wire_names() {
        assert_eq!(
            "remap_by_name".parse::<MigrationPolicy>().unwrap(),
            MigrationPolicy::RemapByName
        );
        let err = "merge".parse::<MigrationPolicy>().unwrap_err();
        assert!(matches!(err, Error::InvalidValue { kind: "MigrationPolicy", .. }));
    }

    fn fields(n: usize) -> Vec<FieldDef> {
        (0..n)
            .map(|i| FieldDef::new(format!("f{i}"), FieldType::Text))
            .collect()
    }

    #[test]
    fn slots_are_assigned_in_declaration_order() {
        let mappings = plan_mappings(Uuid::nil(), 1, &fields(3)).unwrap();
        let columns: Vec<&str> = mappings.iter().map(|m| m.column.column_name()).collect();
        assert_eq!(columns, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn thirty_fields_fit() {
        let mappings = plan_mappings(Uuid::nil(), 1, &fields(30)).unwrap();
        assert_eq!(mappings[29].column.column_name(), "c30");
    }

    #[test]
    fn thirty_one_fields_exceed_capacity() {
        let err = plan_mappings(Uuid::nil(), 1, &fields(31)).unwrap_err();
        assert!(matches!(
            err,
            Error::CapacityExceeded {
                limit: 30,
                requested: 31
            }
        ));
    }

    #[test]
    fn duplicate_field_names_rejected() {
        let mut defs = fields(2);
        defs[1].name = "f0".to_string();
        assert!(matches!(
            plan_mappings(Uuid::nil(), 1, &defs),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn field_config_keeps_recognized_keys() {
        let def: FieldDef = serde_json::from_value(json!({
            "name": "honor", "label": "Honor", "type": "currency",
            "min": 0, "prefix": "Rp", "required": true
        }))
        .unwrap();
        let config = FieldConfig::from_def(&def).unwrap();
        assert_eq!(config.label, "Honor");
        assert!(config.required);
        assert_eq!(config.validation["prefix"], "Rp");
        assert_eq!(config.validation["min"], 0.0);
        assert!(!config.validation.contains_key("max"));
    }

    #[test]
    fn column_slot_parses_names() {
        assert_eq!(ColumnSlot::parse("c17").map(ColumnSlot::position), Some(17));
        assert!(ColumnSlot::parse("c31").is_none());
        assert!(ColumnSlot::parse("c0").is_none());
        assert!(ColumnSlot::parse("x1").is_none());
    }

    #[test]
    fn unknown_field_is_not_mapped() {
        let schema = ColumnMappingSchema {
            criterion_id: Uuid::nil(),
            version: 1,
            mappings: plan_mappings(Uuid::nil(), 1, &fields(2)).unwrap(),
        };
        assert_eq!(schema.column_for("f1").unwrap().column_name(), "c2");
        assert!(matches!(
            schema.column_for("nope"),
            Err(Error::FieldNotMapped { .. })
        ));
        assert_eq!(schema.reverse_dictionary()["c1"], "f0");
    }

    #[test]
    fn remap_follows_field_names() {
        let old_defs = vec![
            FieldDef::new("nama", FieldType::Text),
            FieldDef::new("nidn", FieldType::Text),
            FieldDef::new("lama", FieldType::Text),
        ];
        let old = ColumnMappingSchema {
            criterion_id: Uuid::nil(),
            version: 1,
            mappings: plan_mappings(Uuid::nil(), 1, &old_defs).unwrap(),
        };
        let new_defs = vec![
            FieldDef::new("nidn", FieldType::Text),
            FieldDef::new("nama", FieldType::Text),
            FieldDef::new("baru", FieldType::Text),
        ];
        let new = plan_mappings(Uuid::nil(), 2, &new_defs).unwrap();

        let row = old
            .encode(&json!({"nama": "Ani", "nidn": "001", "lama": "x"}).as_object().cloned().unwrap())
            .unwrap();
        let moved = remap_columns(&row, &old, &new);
        let slot = |n| ColumnSlot::new(n).unwrap();
        assert_eq!(moved[&slot(1)], "001");
        assert_eq!(moved[&slot(2)], "Ani");
        assert!(!moved.contains_key(&slot(3)));
    }
}
