//! Resume Data Model: the normalized, serializable resume aggregate.
//!
//! `ResumeDocument` exclusively owns its five ordered collections. All mutation
//! goes through id-keyed operations (never positional indexes) so that a caller
//! holding an id is never invalidated by an earlier insert or delete.
//!
//! JSON field names are camelCase to match the client wire contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::text::is_valid_month_year;

// ────────────────────────────────────────────────────────────────────────────
// Entities
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub website: String,
    /// 2–3 sentence professional blurb.
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(default)]
    pub id: String,
    pub company: String,
    pub position: String,
    pub location: String,
    pub start_date: String,
    /// Ignored for display when `current` is true, whatever is stored here.
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub current: bool,
    /// Newline-separated; each non-empty line is one bullet.
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default)]
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub gpa: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(default)]
    pub id: String,
    pub category: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Comma-separated free text, rendered verbatim.
    #[serde(default)]
    pub technologies: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub issuer: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub link: String,
}

/// Root aggregate: personal info plus five ordered collections.
/// Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDocument {
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
}

// ────────────────────────────────────────────────────────────────────────────
// Collections and entries
// ────────────────────────────────────────────────────────────────────────────

/// The five id-keyed collections of a `ResumeDocument`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
}

impl Collection {
    /// Prefix for generated ids, e.g. `exp_6f1c…`.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Collection::Experience => "exp",
            Collection::Education => "edu",
            Collection::Skills => "skill",
            Collection::Projects => "proj",
            Collection::Certifications => "cert",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Experience => "experience",
            Collection::Education => "education",
            Collection::Skills => "skills",
            Collection::Projects => "projects",
            Collection::Certifications => "certifications",
        }
    }
}

/// One entity of any collection, used by the generic add/update operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "entry", rename_all = "snake_case")]
pub enum Entry {
    Experience(Experience),
    Education(Education),
    Skills(Skill),
    Projects(Project),
    Certifications(Certification),
}

impl Entry {
    /// Deserializes an untagged JSON body as an entry of `collection`.
    pub fn from_json(collection: Collection, value: serde_json::Value) -> Result<Self, ModelError> {
        let parsed = match collection {
            Collection::Experience => serde_json::from_value(value).map(Entry::Experience),
            Collection::Education => serde_json::from_value(value).map(Entry::Education),
            Collection::Skills => serde_json::from_value(value).map(Entry::Skills),
            Collection::Projects => serde_json::from_value(value).map(Entry::Projects),
            Collection::Certifications => {
                serde_json::from_value(value).map(Entry::Certifications)
            }
        };
        parsed.map_err(|e| ModelError::Validation(format!("invalid {} entry: {e}", collection.as_str())))
    }

    pub fn collection(&self) -> Collection {
        match self {
            Entry::Experience(_) => Collection::Experience,
            Entry::Education(_) => Collection::Education,
            Entry::Skills(_) => Collection::Skills,
            Entry::Projects(_) => Collection::Projects,
            Entry::Certifications(_) => Collection::Certifications,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entry::Experience(e) => e.id(),
            Entry::Education(e) => e.id(),
            Entry::Skills(e) => e.id(),
            Entry::Projects(e) => e.id(),
            Entry::Certifications(e) => e.id(),
        }
    }
}

/// Common access to the id of every collection entity.
pub trait Identified {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

macro_rules! impl_identified {
    ($($ty:ty),*) => {
        $(impl Identified for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        })*
    };
}

impl_identified!(Experience, Education, Skill, Project, Certification);

/// Returns a fresh id for `collection`, unique for the lifetime of any document.
pub fn generate_id(collection: Collection) -> String {
    format!("{}_{}", collection.id_prefix(), Uuid::new_v4().simple())
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("{collection} entry '{id}' not found")]
    NotFound { collection: &'static str, id: String },

    #[error("{collection} entry '{id}' already exists")]
    DuplicateId { collection: &'static str, id: String },

    #[error("skill category '{0}' must list at least one skill")]
    EmptySkills(String),

    #[error("{field} must be empty or YYYY-MM, got '{value}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("{0}")]
    Validation(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Mutations
// ────────────────────────────────────────────────────────────────────────────

impl ResumeDocument {
    pub fn set_personal_info(&mut self, info: PersonalInfo) {
        self.personal_info = info;
    }

    /// Appends an entry, assigning a fresh id when it has none.
    /// Returns the id the entry was stored under.
    pub fn add(&mut self, entry: Entry) -> Result<String, ModelError> {
        let entry = validate_entry(entry)?;
        match entry {
            Entry::Experience(e) => push_unique(&mut self.experience, e, Collection::Experience),
            Entry::Education(e) => push_unique(&mut self.education, e, Collection::Education),
            Entry::Skills(e) => push_unique(&mut self.skills, e, Collection::Skills),
            Entry::Projects(e) => push_unique(&mut self.projects, e, Collection::Projects),
            Entry::Certifications(e) => {
                push_unique(&mut self.certifications, e, Collection::Certifications)
            }
        }
    }

    /// Replaces the entry stored under `id` with `entry` (full record, not a patch).
    /// The keyed id wins over whatever id the replacement carries.
    pub fn update(&mut self, id: &str, entry: Entry) -> Result<(), ModelError> {
        let entry = validate_entry(entry)?;
        match entry {
            Entry::Experience(e) => replace_by_id(&mut self.experience, id, e, Collection::Experience),
            Entry::Education(e) => replace_by_id(&mut self.education, id, e, Collection::Education),
            Entry::Skills(e) => replace_by_id(&mut self.skills, id, e, Collection::Skills),
            Entry::Projects(e) => replace_by_id(&mut self.projects, id, e, Collection::Projects),
            Entry::Certifications(e) => {
                replace_by_id(&mut self.certifications, id, e, Collection::Certifications)
            }
        }
    }

    /// Removes the entry with `id`. Idempotent: returns `false` if nothing matched.
    pub fn delete(&mut self, collection: Collection, id: &str) -> bool {
        match collection {
            Collection::Experience => remove_by_id(&mut self.experience, id),
            Collection::Education => remove_by_id(&mut self.education, id),
            Collection::Skills => remove_by_id(&mut self.skills, id),
            Collection::Projects => remove_by_id(&mut self.projects, id),
            Collection::Certifications => remove_by_id(&mut self.certifications, id),
        }
    }

    /// Re-admits every entry through `add`, so a document that arrived whole
    /// (request body, client import) meets the same invariants as one built
    /// entry by entry. Blank ids are filled; order is kept.
    pub fn validated(self) -> Result<Self, ModelError> {
        let mut doc = ResumeDocument {
            personal_info: self.personal_info,
            ..Default::default()
        };
        let entries = self
            .experience
            .into_iter()
            .map(Entry::Experience)
            .chain(self.education.into_iter().map(Entry::Education))
            .chain(self.skills.into_iter().map(Entry::Skills))
            .chain(self.projects.into_iter().map(Entry::Projects))
            .chain(self.certifications.into_iter().map(Entry::Certifications));
        for entry in entries {
            doc.add(entry)?;
        }
        Ok(doc)
    }

    pub fn len_of(&self, collection: Collection) -> usize {
        match collection {
            Collection::Experience => self.experience.len(),
            Collection::Education => self.education.len(),
            Collection::Skills => self.skills.len(),
            Collection::Projects => self.projects.len(),
            Collection::Certifications => self.certifications.len(),
        }
    }
}

fn push_unique<T: Identified>(
    items: &mut Vec<T>,
    mut item: T,
    collection: Collection,
) -> Result<String, ModelError> {
    if item.id().trim().is_empty() {
        item.set_id(generate_id(collection));
    } else if items.iter().any(|existing| existing.id() == item.id()) {
        return Err(ModelError::DuplicateId {
            collection: collection.as_str(),
            id: item.id().to_string(),
        });
    }
    let id = item.id().to_string();
    items.push(item);
    Ok(id)
}

fn replace_by_id<T: Identified>(
    items: &mut [T],
    id: &str,
    mut item: T,
    collection: Collection,
) -> Result<(), ModelError> {
    let slot = items
        .iter_mut()
        .find(|existing| existing.id() == id)
        .ok_or_else(|| ModelError::NotFound {
            collection: collection.as_str(),
            id: id.to_string(),
        })?;
    item.set_id(id.to_string());
    *slot = item;
    Ok(())
}

fn remove_by_id<T: Identified>(items: &mut Vec<T>, id: &str) -> bool {
    let before = items.len();
    items.retain(|existing| existing.id() != id);
    items.len() != before
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

/// Enforces the commit-time invariants. Skill names are trimmed and blanks
/// dropped before the non-empty check.
fn validate_entry(entry: Entry) -> Result<Entry, ModelError> {
    match entry {
        Entry::Experience(e) => {
            check_date("startDate", &e.start_date)?;
            if !e.current {
                check_date("endDate", &e.end_date)?;
            }
            Ok(Entry::Experience(e))
        }
        Entry::Education(e) => {
            check_date("startDate", &e.start_date)?;
            check_date("endDate", &e.end_date)?;
            Ok(Entry::Education(e))
        }
        Entry::Skills(mut s) => {
            s.skills = s
                .skills
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
            if s.skills.is_empty() {
                return Err(ModelError::EmptySkills(s.category));
            }
            Ok(Entry::Skills(s))
        }
        Entry::Projects(p) => {
            check_date("startDate", &p.start_date)?;
            check_date("endDate", &p.end_date)?;
            Ok(Entry::Projects(p))
        }
        Entry::Certifications(c) => {
            check_date("date", &c.date)?;
            Ok(Entry::Certifications(c))
        }
    }
}

fn check_date(field: &'static str, value: &str) -> Result<(), ModelError> {
    if value.is_empty() || is_valid_month_year(value) {
        Ok(())
    } else {
        Err(ModelError::InvalidDate {
            field,
            value: value.to_string(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
