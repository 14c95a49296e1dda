use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Organisational unit (faculty, bureau, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUnit {
    pub code: String,
    pub name: String,
}

impl NewUnit {
    pub fn into_unit(self) -> Result<Unit> {
        let code = required("code", &self.code)?;
        let name = required("name", &self.name)?;
        Ok(Unit {
            id: Uuid::new_v4(),
            code,
            name,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyProgram {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub unit_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudyProgram {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
}

impl NewStudyProgram {
    pub fn into_program(self) -> Result<StudyProgram> {
        let code = required("code", &self.code)?;
        let name = required("name", &self.name)?;
        Ok(StudyProgram {
            id: Uuid::new_v4(),
            code,
            name,
            unit_id: self.unit_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: Uuid,
    /// e.g. `2025/2026`
    pub label: String,
    pub is_active: bool,
}

impl AcademicYear {
    pub fn new(label: &str) -> Result<Self> {
        let label = required("label", label)?;
        Ok(Self {
            id: Uuid::new_v4(),
            label,
            is_active: false,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(Error::validation(field, format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}
