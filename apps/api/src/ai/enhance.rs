//! Text enhancement: rewrites a summary or an experience description.
//!
//! On failure the caller keeps its original text; nothing here touches a
//! stored document.

use serde::{Deserialize, Serialize};

use crate::ai::prompts::{
    ENHANCE_OPTIONS, ENHANCE_SYSTEM, EXPERIENCE_PROMPT_TEMPLATE, SUMMARY_PROMPT_TEMPLATE,
};
use crate::ai::{AiClient, AiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhanceKind {
    /// 2–3 sentence professional summary.
    Summary,
    /// 3–5 newline-separated bullet lines.
    Experience,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnhanceRequest {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: EnhanceKind,
    /// Free-form guidance such as `"{position} at {company}"`.
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub enhanced_text: String,
}

pub fn build_enhance_prompt(req: &EnhanceRequest) -> String {
    let text = req.text.trim();
    match req.kind {
        EnhanceKind::Summary => SUMMARY_PROMPT_TEMPLATE.replace("{text}", text),
        EnhanceKind::Experience => {
            let context = req
                .context
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| format!("Job context: {c}\n\n"))
                .unwrap_or_default();
            EXPERIENCE_PROMPT_TEMPLATE
                .replace("{context}", &context)
                .replace("{text}", text)
        }
    }
}

pub async fn enhance(client: &AiClient, req: &EnhanceRequest) -> Result<EnhanceResponse, AiError> {
    let prompt = build_enhance_prompt(req);
    let enhanced_text = client
        .call_text(ENHANCE_SYSTEM, &prompt, ENHANCE_OPTIONS)
        .await?;
    tracing::info!(kind = ?req.kind, chars = enhanced_text.len(), "text enhanced");
    Ok(EnhanceResponse { enhanced_text })
}
