//! Job field extraction: asks the model for a structured record of a job description.
//!
//! The reply is accepted if it is (or contains) a JSON object; nothing else is
//! validated. The record is then normalized so every known field is present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::errors::StageError;
use crate::job::prompts::fields_prompt;
use crate::llm_client::{CompletionOptions, LlmClient};

/// The sixteen fields the model is asked for, in prompt order.
pub const JOB_FIELDS: [&str; 16] = [
    "job_title",
    "company_name",
    "location",
    "employment_type",
    "seniority_level",
    "hard_skills",
    "soft_skills",
    "certifications",
    "tools",
    "experience",
    "education_level",
    "duties_and_responsibilities",
    "preferred_skills",
    "communication_skills",
    "language",
    "salary",
];

/// Fields whose value is a list of strings.
pub const LIST_FIELDS: [&str; 8] = [
    "hard_skills",
    "soft_skills",
    "certifications",
    "tools",
    "duties_and_responsibilities",
    "preferred_skills",
    "communication_skills",
    "language",
];

const FIELDS_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.0,
    max_tokens: 1200,
};

/// Structured job information as returned by the model.
///
/// Kept as a JSON object rather than a struct: the model decides the value
/// shapes and any of them may be null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRecord(Map<String, Value>);

impl JobRecord {
    /// Wraps a JSON value if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map).normalized()),
            _ => None,
        }
    }

    /// Fills in missing fields with null and wraps bare strings in list fields.
    fn normalized(mut self) -> Self {
        for field in JOB_FIELDS {
            self.0.entry(field).or_insert(Value::Null);
        }
        for field in LIST_FIELDS {
            let wrapped = match self.0.get(field) {
                Some(Value::String(s)) if s.trim().is_empty() => Value::Array(Vec::new()),
                Some(Value::String(s)) => Value::Array(vec![Value::String(s.clone())]),
                _ => continue,
            };
            self.0.insert(field.to_string(), wrapped);
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn job_title(&self) -> Option<&str> {
        self.get("job_title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
    }

    /// Number of known fields the model actually filled in.
    pub fn populated_count(&self) -> usize {
        JOB_FIELDS
            .iter()
            .filter(|field| match self.0.get(**field) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(Value::Array(items)) => !items.is_empty(),
                Some(_) => true,
            })
            .count()
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Sends `job_text` to the model and parses its reply into a [`JobRecord`].
pub async fn extract_job_fields(job_text: &str, llm: &LlmClient) -> Result<JobRecord, StageError> {
    let prompt = fields_prompt(&JOB_FIELDS, job_text);

    let reply = llm.complete(&prompt, FIELDS_OPTIONS).await.map_err(|e| {
        warn!("Field extraction request failed: {e}");
        StageError::transport(e.to_string())
    })?;

    let record = parse_job_record(&reply)?;
    info!(
        "Extracted job record: {}/{} fields populated",
        record.populated_count(),
        JOB_FIELDS.len()
    );
    Ok(record)
}

/// Parses a model reply: strict JSON first, then the outermost `{...}` span.
pub fn parse_job_record(reply: &str) -> Result<JobRecord, StageError> {
    if let Some(record) = serde_json::from_str::<Value>(reply.trim())
        .ok()
        .and_then(JobRecord::from_value)
    {
        return Ok(record);
    }

    if let Some(candidate) = brace_span(reply) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                if let Some(record) = JobRecord::from_value(value) {
                    return Ok(record);
                }
            }
            Err(e) => warn!("Embedded JSON in model reply did not parse: {e}"),
        }
    }

    Err(StageError::parse("No valid JSON detected", reply))
}

/// From the first `{` to the last `}` inclusive.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
