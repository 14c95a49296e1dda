use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::form::FormConfig;
use crate::{Error, Result};

/// Free-form criterion metadata. `form_config` and `required_fields` are
/// interpreted; everything else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_config: Option<FormConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A "butir akreditasi": one node of the criterion tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub id: Uuid,
    pub kode: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub period_id: Option<Uuid>,
    pub weight: Option<f64>,
    pub display_order: i64,
    pub metadata: CriterionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Criterion {
    pub const fn form_config(&self) -> Option<&FormConfig> {
        self.metadata.form_config.as_ref()
    }

    /// Keys a plain (form-less) submission must fill. Defaults to `content`.
    pub fn required_fields(&self) -> Vec<String> {
        if self.metadata.required_fields.is_empty() {
            vec!["content".to_string()]
        } else {
            self.metadata.required_fields.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCriterion {
    pub kode: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub period_id: Option<Uuid>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default)]
    pub metadata: CriterionMetadata,
}

impl NewCriterion {
    pub fn validate(&self) -> Result<()> {
        if self.kode.trim().is_empty() {
            return Err(Error::validation("kode", "kode is required"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "name is required"));
        }
        if self.weight.is_some_and(|w| w < 0.0) {
            return Err(Error::validation("weight", "weight must not be negative"));
        }
        Ok(())
    }

    pub fn into_criterion(self) -> Criterion {
        let now = Utc::now();
        Criterion {
            id: Uuid::new_v4(),
            kode: self.kode.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            parent_id: self.parent_id,
            period_id: self.period_id,
            weight: self.weight,
            display_order: self.display_order,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriterionUpdate {
    pub kode: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub display_order: Option<i64>,
    pub metadata: Option<CriterionMetadata>,
}

impl CriterionUpdate {
    pub fn apply(self, criterion: &mut Criterion) {
        if let Some(kode) = self.kode {
            criterion.kode = kode.trim().to_string();
        }
        if let Some(name) = self.name {
            criterion.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            criterion.description = Some(description);
        }
        if let Some(weight) = self.weight {
            criterion.weight = Some(weight);
        }
        if let Some(order) = self.display_order {
            criterion.display_order = order;
        }
        if let Some(metadata) = self.metadata {
            criterion.metadata = metadata;
        }
        criterion.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CriterionNode {
    #[serde(flatten)]
    pub criterion: Criterion,
    pub children: Vec<CriterionNode>,
}

/// Nests a flat criterion list into a forest. Siblings are ordered by
/// `display_order`, then `kode`. Nodes whose parent is not in the list
/// become roots.
pub fn build_tree(criteria: Vec<Criterion>) -> Vec<CriterionNode> {
    let present: std::collections::HashSet<Uuid> = criteria.iter().map(|c| c.id).collect();
    let mut by_parent: HashMap<Option<Uuid>, Vec<Criterion>> = HashMap::new();
    for criterion in criteria {
        let key = criterion.parent_id.filter(|p| present.contains(p));
        by_parent.entry(key).or_default().push(criterion);
    }
    attach(None, &mut by_parent)
}

fn attach(
    parent: Option<Uuid>,
    by_parent: &mut HashMap<Option<Uuid>, Vec<Criterion>>,
) -> Vec<CriterionNode> {
    let mut level = by_parent.remove(&parent).unwrap_or_default();
    level.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.kode.cmp(&b.kode))
    });
    level
        .into_iter()
        .map(|criterion| {
            let children = attach(Some(criterion.id), by_parent);
            CriterionNode {
                criterion,
                children,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(kode: &str, parent: Option<Uuid>, order: i64) -> Criterion {
        NewCriterion {
            kode: kode.to_string(),
            name: kode.to_string(),
            description: None,
            parent_id: parent,
            period_id: None,
            weight: None,
            display_order: order,
            metadata: CriterionMetadata::default(),
        }
        .into_criterion()
    }

    #[test]
    fn tree_nests_and_orders_siblings() {
        let root = criterion("C1", None, 0);
        let b = criterion("C1.2", Some(root.id), 2);
        let a = criterion("C1.1", Some(root.id), 1);
        let leaf = criterion("C1.1.1", Some(a.id), 0);

        let tree = build_tree(vec![leaf, b, root, a]);
        assert_eq!(tree.len(), 1);
        let kids: Vec<&str> = tree[0].children.iter().map(|n| n.criterion.kode.as_str()).collect();
        assert_eq!(kids, vec!["C1.1", "C1.2"]);
        assert_eq!(tree[0].children[0].children[0].criterion.kode, "C1.1.1");
    }

    #[test]
    fn metadata_keeps_unknown_keys() {
        let meta: CriterionMetadata = serde_json::from_value(serde_json::json!({
            "required_fields": ["link_dokumen"],
            "bobot_lam": 2.5
        }))
        .unwrap();
        assert_eq!(meta.required_fields, vec!["link_dokumen"]);
        assert!(meta.form_config.is_none());
        assert_eq!(meta.extra["bobot_lam"], 2.5);
    }

    #[test]
    fn plain_criterion_requires_content() {
        let c = criterion("C2", None, 0);
        assert_eq!(c.required_fields(), vec!["content"]);
    }
}
