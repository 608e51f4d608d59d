//! ATS resume evaluation
//!
//! Scores extracted resume text against a job description with a language
//! model. The model is asked for a strict JSON object; the first `{ ... }` span
//! of its reply is parsed and missing fields fall back to fixed defaults.

use crate::answer::LanguageModel;
use crate::error::PipelineError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Placeholder the prompt uses for the score; seeing it back means no score
pub const PLACEHOLDER_MATCH: &str = "XX%";
pub const NO_MISSING_KEYWORDS: &str = "No missing keywords";
const NO_SUMMARY: &str = "No summary available.";
const NO_EXPERIENCE: &str = "No experience details available.";

/// Scores at or above this are recommended for hiring
pub const HIRING_THRESHOLD: f32 = 80.0;

lazy_static! {
    static ref JSON_OBJECT: Regex = Regex::new(r"(?s)\{.*\}").expect("valid JSON span pattern");
}

/// Standardized evaluation returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsEvaluation {
    #[serde(rename = "Job Description Match")]
    pub job_description_match: String,
    #[serde(rename = "Missing Keywords")]
    pub missing_keywords: String,
    #[serde(rename = "Candidate Summary")]
    pub candidate_summary: String,
    #[serde(rename = "Experience")]
    pub experience: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    MoveForward,
    ImproveKeywords,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::MoveForward => "Move forward with hiring",
            Recommendation::ImproveKeywords => "Profile matched! Improve missing keywords.",
        }
    }
}

impl AtsEvaluation {
    /// Numeric score, e.g. `"85%"` -> 85.0
    pub fn match_percentage(&self) -> Option<f32> {
        self.job_description_match
            .replace('%', "")
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|score| score.is_finite())
    }

    pub fn has_missing_keywords(&self) -> bool {
        !self
            .missing_keywords
            .trim()
            .eq_ignore_ascii_case(NO_MISSING_KEYWORDS)
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.match_percentage().map(|score| {
            if score >= HIRING_THRESHOLD {
                Recommendation::MoveForward
            } else {
                Recommendation::ImproveKeywords
            }
        })
    }
}

/// Build the evaluation prompt for a resume / job description pair
pub fn build_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        r#"You are an ATS system evaluator. Your task is to analyze the resume against the given job description
and return a JSON response that includes the match score, missing keywords, candidate summary, and relevant experience.

IMPORTANT: Return ONLY valid JSON output, formatted exactly like this:
{{
  "Job Description Match": "XX%",
  "Missing Keywords": "keyword1, keyword2",
  "Candidate Summary": "A summary of the candidate",
  "Experience": "Detailed experience matching the job description"
}}

STRICT RULES:
- Do not include explanations, markdown, or text before/after the JSON.
- Ensure the JSON keys match exactly (do not change them).
- Keep percentages inside strings, like "XX%".
- Missing keywords should be a comma-separated string.
- Return pure JSON, no extra text.

--- Candidate Resume ---
{}

--- Job Description ---
{}
"#,
        resume_text, job_description
    )
}

/// Pull the outermost `{ ... }` span out of free-form model text
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

/// Parse and standardize a raw model reply
pub fn parse_evaluation(response_text: &str) -> crate::Result<AtsEvaluation> {
    let json = extract_json_object(response_text).ok_or_else(|| {
        PipelineError::EvaluationError("model response did not contain a JSON object".to_string())
    })?;

    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
        PipelineError::EvaluationError(format!("model response is not valid JSON: {}", e))
    })?;

    let field = |key: &str, default: &str| -> String {
        match value.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => default.to_string(),
            Some(other) => other.to_string(),
        }
    };

    let evaluation = AtsEvaluation {
        job_description_match: field("Job Description Match", PLACEHOLDER_MATCH),
        missing_keywords: field("Missing Keywords", NO_MISSING_KEYWORDS),
        candidate_summary: field("Candidate Summary", NO_SUMMARY),
        experience: field("Experience", NO_EXPERIENCE),
    };

    if evaluation.job_description_match == PLACEHOLDER_MATCH
        || evaluation.match_percentage().is_none()
    {
        return Err(PipelineError::EvaluationError(
            "model did not generate a valid match score".to_string(),
        ));
    }

    Ok(evaluation)
}

/// Evaluates resumes with a language model
pub struct AtsEvaluator {
    model: Arc<dyn LanguageModel>,
}

impl AtsEvaluator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn evaluate(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> crate::Result<AtsEvaluation> {
        if resume_text.trim().is_empty() {
            return Err(PipelineError::EvaluationError(
                "resume text is empty".to_string(),
            ));
        }

        let prompt = build_prompt(resume_text, job_description);
        let response = self.model.generate(&prompt).await?;
        debug!("Raw ATS response: {}", response);

        match parse_evaluation(&response) {
            Ok(evaluation) => {
                info!(
                    "ATS evaluation complete (match: {})",
                    evaluation.job_description_match
                );
                Ok(evaluation)
            }
            Err(e) => {
                warn!("ATS evaluation rejected: {}", e);
                Err(e)
            }
        }
    }
}
