//! Resume extraction: turns an uploaded resume image into a `ResumeDocument`.
//!
//! The model's JSON is never trusted as-is. It is read through a lenient
//! schema where every field is optional and wrongly-typed values degrade to
//! their empty default, then normalized into a document the data model
//! would accept:
//!   - entities without an id, or with an id already used in the same
//!     collection, get a fresh one
//!   - experience descriptions go through `strip_bullet_markers`
//!   - dates that are not `YYYY-MM` are blanked
//!   - skills given as one comma-separated string are split, and skill
//!     groups left with no names are dropped

use std::collections::HashSet;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::prompts::{EXTRACTION_OPTIONS, EXTRACTION_PROMPT, EXTRACTION_SYSTEM};
use crate::ai::{AiClient, AiError, ImageAttachment};
use crate::data_url::DataUrl;
use crate::models::resume::{
    generate_id, Certification, Collection, Education, Experience, Identified, PersonalInfo,
    Project, ResumeDocument, Skill,
};
use crate::text::{is_valid_month_year, strip_bullet_markers};

// ────────────────────────────────────────────────────────────────────────────
// Request / response
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseDocumentRequest {
    /// `data:image/png;base64,...`
    pub file: String,
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseDocumentResponse {
    pub resume_data: ResumeDocument,
}

/// A validated image upload ready to attach to a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub media_type: &'static str,
    pub data_base64: String,
}

impl DocumentUpload {
    /// Accepts JPEG or PNG uploads no larger than `max_bytes` once decoded.
    pub fn from_request(req: &ParseDocumentRequest, max_bytes: usize) -> Result<Self, AiError> {
        let media_type = match req.file_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => "image/jpeg",
            "image/png" => "image/png",
            _ => {
                return Err(AiError::InvalidUpload(
                    "Please import a JPEG or PNG file.".to_string(),
                ))
            }
        };

        let url = DataUrl::parse(&req.file).map_err(|e| {
            AiError::InvalidUpload(format!("The uploaded file could not be read: {e}."))
        })?;
        if url.bytes.len() > max_bytes {
            return Err(AiError::InvalidUpload(format!(
                "The uploaded file is larger than {} MB.",
                max_bytes / (1024 * 1024)
            )));
        }

        Ok(Self {
            media_type,
            data_base64: url.encoded(),
        })
    }
}

pub async fn parse_document(
    client: &AiClient,
    upload: &DocumentUpload,
) -> Result<ResumeDocument, AiError> {
    let raw: RawResume = client
        .call_json(
            EXTRACTION_SYSTEM,
            EXTRACTION_PROMPT,
            Some(ImageAttachment {
                media_type: upload.media_type,
                data_base64: &upload.data_base64,
            }),
            EXTRACTION_OPTIONS,
        )
        .await?;
    let document = raw.into_document();
    tracing::info!(
        experience = document.experience.len(),
        education = document.education.len(),
        skills = document.skills.len(),
        projects = document.projects.len(),
        certifications = document.certifications.len(),
        "resume extracted"
    );
    Ok(document)
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient field readers
// ────────────────────────────────────────────────────────────────────────────

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Keeps the array items that parse and skips the rest; non-arrays become empty.
fn lenient_list<'de, D: Deserializer<'de>, T: DeserializeOwned>(d: D) -> Result<Vec<T>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_names<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let names: Vec<String> = match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    Ok(names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

fn lenient_personal_info<'de, D: Deserializer<'de>>(d: D) -> Result<RawPersonalInfo, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
        _ => RawPersonalInfo::default(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient schema
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawResume {
    #[serde(deserialize_with = "lenient_personal_info")]
    personal_info: RawPersonalInfo,
    #[serde(deserialize_with = "lenient_list")]
    experience: Vec<RawExperience>,
    #[serde(deserialize_with = "lenient_list")]
    education: Vec<RawEducation>,
    #[serde(deserialize_with = "lenient_list")]
    skills: Vec<RawSkill>,
    #[serde(deserialize_with = "lenient_list")]
    projects: Vec<RawProject>,
    #[serde(deserialize_with = "lenient_list")]
    certifications: Vec<RawCertification>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPersonalInfo {
    #[serde(deserialize_with = "lenient_string")]
    full_name: String,
    #[serde(deserialize_with = "lenient_string")]
    email: String,
    #[serde(deserialize_with = "lenient_string")]
    phone: String,
    #[serde(deserialize_with = "lenient_string")]
    location: String,
    #[serde(deserialize_with = "lenient_string")]
    linkedin: String,
    #[serde(deserialize_with = "lenient_string")]
    website: String,
    #[serde(deserialize_with = "lenient_string")]
    summary: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawExperience {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    company: String,
    #[serde(deserialize_with = "lenient_string")]
    position: String,
    #[serde(deserialize_with = "lenient_string")]
    location: String,
    #[serde(deserialize_with = "lenient_string")]
    start_date: String,
    #[serde(deserialize_with = "lenient_string")]
    end_date: String,
    #[serde(deserialize_with = "lenient_bool")]
    current: bool,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawEducation {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    institution: String,
    #[serde(deserialize_with = "lenient_string")]
    degree: String,
    #[serde(deserialize_with = "lenient_string")]
    field: String,
    #[serde(deserialize_with = "lenient_string")]
    location: String,
    #[serde(deserialize_with = "lenient_string")]
    start_date: String,
    #[serde(deserialize_with = "lenient_string")]
    end_date: String,
    #[serde(deserialize_with = "lenient_string")]
    gpa: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSkill {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    category: String,
    #[serde(deserialize_with = "lenient_names")]
    skills: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawProject {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
    #[serde(deserialize_with = "lenient_string")]
    technologies: String,
    #[serde(deserialize_with = "lenient_string")]
    link: String,
    #[serde(deserialize_with = "lenient_string")]
    start_date: String,
    #[serde(deserialize_with = "lenient_string")]
    end_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawCertification {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_string")]
    issuer: String,
    #[serde(deserialize_with = "lenient_string")]
    date: String,
    #[serde(deserialize_with = "lenient_string")]
    link: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

fn date_or_blank(date: String) -> String {
    if is_valid_month_year(&date) {
        date
    } else {
        String::new()
    }
}

/// Gives every entity a non-empty id unique within its collection.
fn assign_ids<T: Identified>(items: &mut [T], collection: Collection) {
    let mut seen = HashSet::new();
    for item in items.iter_mut() {
        if item.id().is_empty() || !seen.insert(item.id().to_string()) {
            let id = generate_id(collection);
            seen.insert(id.clone());
            item.set_id(id);
        }
    }
}

impl RawResume {
    pub fn into_document(self) -> ResumeDocument {
        let p = self.personal_info;
        let mut doc = ResumeDocument {
            personal_info: PersonalInfo {
                full_name: p.full_name,
                email: p.email,
                phone: p.phone,
                location: p.location,
                linkedin: p.linkedin,
                website: p.website,
                summary: p.summary,
            },
            experience: self
                .experience
                .into_iter()
                .map(|e| Experience {
                    id: e.id,
                    company: e.company,
                    position: e.position,
                    location: e.location,
                    start_date: date_or_blank(e.start_date),
                    end_date: if e.current {
                        String::new()
                    } else {
                        date_or_blank(e.end_date)
                    },
                    current: e.current,
                    description: strip_bullet_markers(&e.description),
                })
                .collect(),
            education: self
                .education
                .into_iter()
                .map(|e| Education {
                    id: e.id,
                    institution: e.institution,
                    degree: e.degree,
                    field: e.field,
                    location: e.location,
                    start_date: date_or_blank(e.start_date),
                    end_date: date_or_blank(e.end_date),
                    gpa: e.gpa,
                })
                .collect(),
            skills: self
                .skills
                .into_iter()
                .filter(|s| !s.skills.is_empty())
                .map(|s| Skill {
                    id: s.id,
                    category: s.category,
                    skills: s.skills,
                })
                .collect(),
            projects: self
                .projects
                .into_iter()
                .map(|p| Project {
                    id: p.id,
                    name: p.name,
                    description: p.description,
                    technologies: p.technologies,
                    link: p.link,
                    start_date: date_or_blank(p.start_date),
                    end_date: date_or_blank(p.end_date),
                })
                .collect(),
            certifications: self
                .certifications
                .into_iter()
                .map(|c| Certification {
                    id: c.id,
                    name: c.name,
                    issuer: c.issuer,
                    date: date_or_blank(c.date),
                    link: c.link,
                })
                .collect(),
        };

        assign_ids(&mut doc.experience, Collection::Experience);
        assign_ids(&mut doc.education, Collection::Education);
        assign_ids(&mut doc.skills, Collection::Skills);
        assign_ids(&mut doc.projects, Collection::Projects);
        assign_ids(&mut doc.certifications, Collection::Certifications);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::parse_json_reply;

    fn normalize(json: &str) -> ResumeDocument {
        parse_json_reply::<RawResume>(json).unwrap().into_document()
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let doc = normalize(r#"{"personalInfo": {"fullName": "Ada"}}"#);
        assert_eq!(doc.personal_info.full_name, "Ada");
        assert!(doc.personal_info.email.is_empty());
        assert!(doc.experience.is_empty());
        assert!(doc.certifications.is_empty());
    }

    #[test]
    fn test_wrong_types_degrade_to_defaults() {
        let doc = normalize(
            r#"{"personalInfo": null, "experience": "none",
                "education": [{"institution": "MIT", "gpa": 3.9, "degree": null}]}"#,
        );
        assert!(doc.personal_info.full_name.is_empty());
        assert!(doc.experience.is_empty());
        assert_eq!(doc.education[0].institution, "MIT");
        assert_eq!(doc.education[0].gpa, "3.9");
        assert!(doc.education[0].degree.is_empty());
    }

    #[test]
    fn test_experience_description_markers_stripped() {
        let doc = normalize(
            r#"{"experience": [{"company": "Acme", "description": "• Led team\n2) Shipped v2\n\n- Hired"}]}"#,
        );
        assert_eq!(doc.experience[0].description, "Led team\nShipped v2\nHired");
    }

    #[test]
    fn test_missing_and_duplicate_ids_replaced() {
        let doc = normalize(
            r#"{"experience": [{"id": "x"}, {"id": "x"}, {}],
                "certifications": [{"name": "AWS"}]}"#,
        );
        let ids: Vec<&str> = doc.experience.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids[0], "x");
        assert!(ids[1].starts_with("exp_"));
        assert!(ids[2].starts_with("exp_"));
        assert_ne!(ids[1], ids[2]);
        assert!(doc.certifications[0].id.starts_with("cert_"));
    }

    #[test]
    fn test_invalid_dates_blanked_and_current_clears_end() {
        let doc = normalize(
            r#"{"experience": [{"startDate": "Jan 2020", "endDate": "2022-05", "current": "true"}],
                "certifications": [{"date": "2021-13"}]}"#,
        );
        assert!(doc.experience[0].start_date.is_empty());
        assert!(doc.experience[0].current);
        assert!(doc.experience[0].end_date.is_empty());
        assert!(doc.certifications[0].date.is_empty());
    }

    #[test]
    fn test_skills_from_string_and_empty_groups_dropped() {
        let doc = normalize(
            r#"{"skills": [
                {"category": "Languages", "skills": "Rust, Go ,, Python"},
                {"category": "Empty", "skills": []},
                {"category": "Blank", "skills": ["  "]}
            ]}"#,
        );
        assert_eq!(doc.skills.len(), 1);
        assert_eq!(doc.skills[0].skills, vec!["Rust", "Go", "Python"]);
    }

    #[test]
    fn test_fenced_reply_is_accepted() {
        let doc = normalize("```json\n{\"personalInfo\": {\"email\": \"a@b.c\"}}\n```");
        assert_eq!(doc.personal_info.email, "a@b.c");
    }

    #[test]
    fn test_non_json_reply_is_malformed() {
        assert!(matches!(
            parse_json_reply::<RawResume>("Sorry, I cannot read this image."),
            Err(AiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_normalized_document_is_accepted_by_the_model() {
        let doc = normalize(
            r#"{"experience": [{"company": "Acme", "startDate": "2020-01"}],
                "skills": [{"category": "Tools", "skills": ["Git"]}]}"#,
        );
        let mut target = ResumeDocument::default();
        for exp in doc.experience {
            target
                .add(crate::models::resume::Entry::Experience(exp))
                .unwrap();
        }
        for skill in doc.skills {
            target.add(crate::models::resume::Entry::Skills(skill)).unwrap();
        }
        assert_eq!(target.experience.len(), 1);
        assert_eq!(target.skills.len(), 1);
    }

    #[test]
    fn test_upload_validation() {
        let ok = ParseDocumentRequest {
            file: "data:image/png;base64,aGVsbG8=".to_string(),
            file_type: "image/PNG".to_string(),
        };
        let upload = DocumentUpload::from_request(&ok, 1024).unwrap();
        assert_eq!(upload.media_type, "image/png");
        assert_eq!(upload.data_base64, "aGVsbG8=");

        let pdf = ParseDocumentRequest {
            file_type: "application/pdf".to_string(),
            ..ok.clone()
        };
        assert!(matches!(
            DocumentUpload::from_request(&pdf, 1024),
            Err(AiError::InvalidUpload(_))
        ));

        assert!(matches!(
            DocumentUpload::from_request(&ok, 3),
            Err(AiError::InvalidUpload(_))
        ));
    }
}
