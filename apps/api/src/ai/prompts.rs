// Prompt constants for text enhancement and resume extraction.

use crate::ai::CallOptions;

/// System prompt shared by both enhancement kinds.
pub const ENHANCE_SYSTEM: &str =
    "You are a professional resume writer who improves resume content. \
    Reply with the improved text only.";

/// Summary rewrite. Replace `{text}` before sending.
pub const SUMMARY_PROMPT_TEMPLATE: &str = "Rewrite the professional summary below so it reads \
as professional, concise and impactful on a resume. Use 2-3 sentences at most and lead with \
achievements and the value the candidate brings. Reply with the rewritten summary only, with no \
preamble or commentary.

Original summary:
{text}";

/// Experience rewrite. Replace `{context}` (possibly empty) and `{text}`.
pub const EXPERIENCE_PROMPT_TEMPLATE: &str = "Rewrite the job description below as \
achievement-focused resume bullet points. Rules:
1. Return 3-5 bullet points and nothing else
2. Start every bullet with a strong action verb
3. Prefer quantifiable achievements and impact
4. Keep each bullet to one or two lines
5. Use professional resume language
6. Put one bullet per line with no bullet symbols and no numbering
7. Do not add any introduction, explanation or commentary

{context}Original description:
{text}";

pub const ENHANCE_OPTIONS: CallOptions = CallOptions {
    max_tokens: 500,
    temperature: 0.7,
};

/// System prompt for extraction; enforces JSON-only output.
pub const EXTRACTION_SYSTEM: &str = "You are a precise resume parser. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

pub const EXTRACTION_PROMPT: &str = r#"Read the attached resume image and extract every piece of information into JSON.

Rules:
1. Transcribe all text accurately
2. Use "" or [] for any section or field the resume does not contain
3. Keep experience and project bullet points as they appear, one per line, separated by newlines
4. Write every date as YYYY-MM (for example "2020-01" for January 2020)
5. Set "current" to true and "endDate" to "" for a role the candidate still holds

Return exactly this structure:
{
  "personalInfo": {
    "fullName": "", "email": "", "phone": "", "location": "",
    "linkedin": "", "website": "", "summary": ""
  },
  "experience": [
    {"company": "", "position": "", "location": "", "startDate": "YYYY-MM",
     "endDate": "YYYY-MM", "current": false, "description": "line one\nline two"}
  ],
  "education": [
    {"institution": "", "degree": "", "field": "", "location": "",
     "startDate": "YYYY-MM", "endDate": "YYYY-MM", "gpa": ""}
  ],
  "skills": [
    {"category": "Programming Languages", "skills": ["Rust", "Go"]}
  ],
  "projects": [
    {"name": "", "description": "", "technologies": "comma, separated", "link": "",
     "startDate": "YYYY-MM", "endDate": "YYYY-MM"}
  ],
  "certifications": [
    {"name": "", "issuer": "", "date": "YYYY-MM", "link": ""}
  ]
}"#;

pub const EXTRACTION_OPTIONS: CallOptions = CallOptions {
    max_tokens: 4096,
    temperature: 0.1,
};
