//! Resume tree: the ordered, format-free structural content of a resume.
//!
//! Both structured exporters and the preview endpoint consume the same tree,
//! so section order, date labels and bullet segmentation cannot drift
//! between PDF, DOCX and the on-screen view.
//!
//! Section order is fixed: Header → Professional Summary → Experience →
//! Education → Skills → Projects → Certifications. A section whose
//! collection is empty (or a blank summary) is omitted entirely.

use serde::Serialize;

use crate::models::resume::{
    Certification, Education, Experience, PersonalInfo, Project, ResumeDocument, Skill,
};
use crate::text::{format_date_range, format_month_year, split_into_bullets};

pub const NAME_PLACEHOLDER: &str = "Your Name";
pub const CONTACT_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Normal,
    /// Bold.
    Strong,
    /// Italic, de-emphasized.
    Subtle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Name {
        text: String,
    },
    ContactLine {
        text: String,
    },
    SectionHeading {
        title: String,
    },
    /// Left text with right-aligned text on the same line.
    EntryLine {
        left: String,
        left_emphasis: Emphasis,
        right: String,
        right_emphasis: Emphasis,
    },
    Bullet {
        text: String,
    },
    Paragraph {
        text: String,
        emphasis: Emphasis,
    },
    /// `"{label}: {value}"` with the label emphasized.
    LabeledLine {
        label: String,
        value: String,
    },
    /// Vertical gap closing one entry.
    EntryEnd,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResumeTree {
    pub blocks: Vec<Block>,
}

impl ResumeTree {
    /// One line per block; entry lines join their halves with a tab and
    /// bullets are prefixed with `"• "`.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Name { text } | Block::ContactLine { text } => text.clone(),
                Block::SectionHeading { title } => title.clone(),
                Block::EntryLine { left, right, .. } => format!("{left}\t{right}"),
                Block::Bullet { text } => format!("• {text}"),
                Block::Paragraph { text, .. } => text.clone(),
                Block::LabeledLine { label, value } => format!("{label}: {value}"),
                Block::EntryEnd => String::new(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn section_titles(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::SectionHeading { title } => Some(title.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Builds the tree for `doc`. Deterministic: equal documents give equal trees.
pub fn build_tree(doc: &ResumeDocument) -> ResumeTree {
    let mut blocks = Vec::new();

    push_header(&mut blocks, &doc.personal_info);

    if !doc.personal_info.summary.trim().is_empty() {
        heading(&mut blocks, "PROFESSIONAL SUMMARY");
        blocks.push(Block::Paragraph {
            text: doc.personal_info.summary.trim().to_string(),
            emphasis: Emphasis::Normal,
        });
    }

    if !doc.experience.is_empty() {
        heading(&mut blocks, "EXPERIENCE");
        doc.experience.iter().for_each(|e| push_experience(&mut blocks, e));
    }

    if !doc.education.is_empty() {
        heading(&mut blocks, "EDUCATION");
        doc.education.iter().for_each(|e| push_education(&mut blocks, e));
    }

    if !doc.skills.is_empty() {
        heading(&mut blocks, "SKILLS");
        doc.skills.iter().for_each(|s| push_skill(&mut blocks, s));
        blocks.push(Block::EntryEnd);
    }

    if !doc.projects.is_empty() {
        heading(&mut blocks, "PROJECTS");
        doc.projects.iter().for_each(|p| push_project(&mut blocks, p));
    }

    if !doc.certifications.is_empty() {
        heading(&mut blocks, "CERTIFICATIONS");
        doc.certifications
            .iter()
            .for_each(|c| push_certification(&mut blocks, c));
    }

    ResumeTree { blocks }
}

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

fn push_header(blocks: &mut Vec<Block>, info: &PersonalInfo) {
    let name = info.full_name.trim();
    blocks.push(Block::Name {
        text: if name.is_empty() { NAME_PLACEHOLDER } else { name }.to_string(),
    });

    if let Some(contact) = join_non_empty(&[&info.email, &info.phone, &info.location]) {
        blocks.push(Block::ContactLine { text: contact });
    }
    if let Some(links) = join_non_empty(&[&info.linkedin, &info.website]) {
        blocks.push(Block::ContactLine { text: links });
    }
}

fn push_experience(blocks: &mut Vec<Block>, exp: &Experience) {
    blocks.push(Block::EntryLine {
        left: exp.position.clone(),
        left_emphasis: Emphasis::Strong,
        right: format_date_range(&exp.start_date, &exp.end_date, exp.current),
        right_emphasis: Emphasis::Subtle,
    });
    blocks.push(Block::EntryLine {
        left: exp.company.clone(),
        left_emphasis: Emphasis::Subtle,
        right: exp.location.clone(),
        right_emphasis: Emphasis::Normal,
    });
    blocks.extend(
        split_into_bullets(&exp.description)
            .into_iter()
            .map(|line| Block::Bullet {
                text: line.to_string(),
            }),
    );
    blocks.push(Block::EntryEnd);
}

fn push_education(blocks: &mut Vec<Block>, edu: &Education) {
    blocks.push(Block::EntryLine {
        left: edu.institution.clone(),
        left_emphasis: Emphasis::Strong,
        right: format_date_range(&edu.start_date, &edu.end_date, false),
        right_emphasis: Emphasis::Subtle,
    });
    blocks.push(Block::EntryLine {
        left: degree_line(&edu.degree, &edu.field),
        left_emphasis: Emphasis::Subtle,
        right: edu.location.clone(),
        right_emphasis: Emphasis::Normal,
    });
    if !edu.gpa.trim().is_empty() {
        blocks.push(Block::Paragraph {
            text: format!("GPA: {}", edu.gpa.trim()),
            emphasis: Emphasis::Normal,
        });
    }
    blocks.push(Block::EntryEnd);
}

fn push_skill(blocks: &mut Vec<Block>, skill: &Skill) {
    blocks.push(Block::LabeledLine {
        label: skill.category.clone(),
        value: skill.skills.join(", "),
    });
}

fn push_project(blocks: &mut Vec<Block>, project: &Project) {
    blocks.push(Block::EntryLine {
        left: project.name.clone(),
        left_emphasis: Emphasis::Strong,
        right: format_date_range(&project.start_date, &project.end_date, false),
        right_emphasis: Emphasis::Subtle,
    });
    if !project.technologies.trim().is_empty() {
        blocks.push(Block::LabeledLine {
            label: "Technologies".to_string(),
            value: project.technologies.trim().to_string(),
        });
    }
    if !project.description.trim().is_empty() {
        blocks.push(Block::Paragraph {
            text: project.description.trim().to_string(),
            emphasis: Emphasis::Normal,
        });
    }
    if !project.link.trim().is_empty() {
        blocks.push(Block::Paragraph {
            text: project.link.trim().to_string(),
            emphasis: Emphasis::Subtle,
        });
    }
    blocks.push(Block::EntryEnd);
}

fn push_certification(blocks: &mut Vec<Block>, cert: &Certification) {
    blocks.push(Block::EntryLine {
        left: cert.name.clone(),
        left_emphasis: Emphasis::Strong,
        right: format_month_year(&cert.date),
        right_emphasis: Emphasis::Subtle,
    });
    blocks.push(Block::Paragraph {
        text: cert.issuer.clone(),
        emphasis: Emphasis::Subtle,
    });
    if !cert.link.trim().is_empty() {
        blocks.push(Block::Paragraph {
            text: cert.link.trim().to_string(),
            emphasis: Emphasis::Normal,
        });
    }
    blocks.push(Block::EntryEnd);
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn heading(blocks: &mut Vec<Block>, title: &str) {
    blocks.push(Block::SectionHeading {
        title: title.to_string(),
    });
}

/// Joins the trimmed non-empty parts with `CONTACT_SEPARATOR`; `None` if all are empty.
fn join_non_empty(parts: &[&String]) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    (!present.is_empty()).then(|| present.join(CONTACT_SEPARATOR))
}

/// `"{degree} in {field}"`, or whichever half is present.
fn degree_line(degree: &str, field: &str) -> String {
    match (degree.trim(), field.trim()) {
        (d, f) if !d.is_empty() && !f.is_empty() => format!("{d} in {f}"),
        (d, "") => d.to_string(),
        (_, f) => f.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A document touching every section, shared with the exporter tests.
    pub(crate) fn sample_document() -> ResumeDocument {
        ResumeDocument {
            personal_info: PersonalInfo {
                full_name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: "+44 20 7946 0000".to_string(),
                location: "London".to_string(),
                linkedin: "linkedin.com/in/ada".to_string(),
                website: String::new(),
                summary: "Analyst and programmer.".to_string(),
            },
            experience: vec![Experience {
                id: "exp_1".to_string(),
                company: "Analytical Engines Ltd".to_string(),
                position: "Lead Programmer".to_string(),
                location: "London".to_string(),
                start_date: "2020-01".to_string(),
                end_date: String::new(),
                current: true,
                description: "Wrote the first algorithm\n\nPublished notes on the engine\n".to_string(),
            }],
            education: vec![Education {
                id: "edu_1".to_string(),
                institution: "University of London".to_string(),
                degree: "BSc".to_string(),
                field: "Mathematics".to_string(),
                location: "London".to_string(),
                start_date: "2014-09".to_string(),
                end_date: "2018-06".to_string(),
                gpa: "3.9".to_string(),
            }],
            skills: vec![Skill {
                id: "skill_1".to_string(),
                category: "Languages".to_string(),
                skills: vec!["Rust".to_string(), "Ada".to_string()],
            }],
            projects: vec![Project {
                id: "proj_1".to_string(),
                name: "Difference Engine".to_string(),
                description: "A mechanical calculator.".to_string(),
                technologies: "Brass, Steam".to_string(),
                link: "https://example.com/engine".to_string(),
                start_date: "2019-01".to_string(),
                end_date: "2019-12".to_string(),
            }],
            certifications: vec![Certification {
                id: "cert_1".to_string(),
                name: "Certified Analyst".to_string(),
                issuer: "Royal Society".to_string(),
                date: "2021-03".to_string(),
                link: String::new(),
            }],
        }
    }

    #[test]
    fn test_section_order_is_fixed() {
        let tree = build_tree(&sample_document());
        assert_eq!(
            tree.section_titles(),
            vec![
                "PROFESSIONAL SUMMARY",
                "EXPERIENCE",
                "EDUCATION",
                "SKILLS",
                "PROJECTS",
                "CERTIFICATIONS"
            ]
        );
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut doc = sample_document();
        doc.skills.clear();
        doc.personal_info.summary = "   ".to_string();
        let tree = build_tree(&doc);
        let titles = tree.section_titles();
        assert!(!titles.contains(&"SKILLS"));
        assert!(!titles.contains(&"PROFESSIONAL SUMMARY"));
        assert!(!tree.plain_text().contains("SKILLS"));
    }

    #[test]
    fn test_blank_document_renders_placeholder_name_only() {
        let tree = build_tree(&ResumeDocument::default());
        assert_eq!(
            tree.blocks,
            vec![Block::Name {
                text: NAME_PLACEHOLDER.to_string()
            }]
        );
    }

    #[test]
    fn test_contact_line_joins_non_empty_parts() {
        let mut doc = ResumeDocument::default();
        doc.personal_info.email = "a@b.c".to_string();
        doc.personal_info.location = "Paris".to_string();
        let tree = build_tree(&doc);
        assert!(tree.blocks.contains(&Block::ContactLine {
            text: "a@b.c | Paris".to_string()
        }));
        // No links line when linkedin and website are both empty
        let contact_lines = tree
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::ContactLine { .. }))
            .count();
        assert_eq!(contact_lines, 1);
    }

    #[test]
    fn test_current_experience_renders_present() {
        let tree = build_tree(&sample_document());
        assert!(tree.plain_text().contains("Lead Programmer\tJan 2020 - Present"));
    }

    #[test]
    fn test_experience_description_becomes_bullets() {
        let tree = build_tree(&sample_document());
        let bullets: Vec<&str> = tree
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Bullet { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            bullets,
            vec!["Wrote the first algorithm", "Published notes on the engine"]
        );
    }

    #[test]
    fn test_education_and_skill_lines() {
        let text = build_tree(&sample_document()).plain_text();
        assert!(text.contains("University of London\tSep 2014 - Jun 2018"));
        assert!(text.contains("BSc in Mathematics\tLondon"));
        assert!(text.contains("GPA: 3.9"));
        assert!(text.contains("Languages: Rust, Ada"));
    }

    #[test]
    fn test_project_and_certification_lines() {
        let text = build_tree(&sample_document()).plain_text();
        assert!(text.contains("Difference Engine\tJan 2019 - Dec 2019"));
        assert!(text.contains("Technologies: Brass, Steam"));
        assert!(text.contains("A mechanical calculator."));
        assert!(text.contains("https://example.com/engine"));
        assert!(text.contains("Certified Analyst\tMar 2021"));
        assert!(text.contains("Royal Society"));
    }

    #[test]
    fn test_tree_is_deterministic() {
        let doc = sample_document();
        assert_eq!(build_tree(&doc), build_tree(&doc));
    }

    #[test]
    fn test_degree_line_variants() {
        assert_eq!(degree_line("BSc", "Physics"), "BSc in Physics");
        assert_eq!(degree_line("BSc", ""), "BSc");
        assert_eq!(degree_line("", "Physics"), "Physics");
    }
}
