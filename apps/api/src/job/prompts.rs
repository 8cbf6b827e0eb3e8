// Prompt templates for the job record and introduction calls.

use crate::llm_client::prompts::JSON_ONLY_RULES;

/// Field extraction prompt. Replace `{field_list}`, `{json_rules}`, `{job_text}`.
const FIELDS_PROMPT_TEMPLATE: &str = r#"You are an expert job information extraction assistant.

From the job description below, extract and return a structured JSON object
with the following fields:

{field_list}

Rules:
- Use lists for fields like skills, certifications, tools, or languages.
- If a field is not present, return null or an empty list.
{json_rules}

Job Description:
"""{job_text}""""#;

/// Introduction prompt. Replace `{min_words}`, `{max_words}`, `{job_json}`.
const INTRO_PROMPT_TEMPLATE: &str = "You are an HR assistant creating a professional spoken job introduction \
for a voice-over. Write a 2-paragraph overview (around {min_words}-{max_words} words) \
highlighting the role, key skills, company, and what makes this position appealing. \
Use a friendly yet professional tone.

Job Data:
{job_json}";

pub fn fields_prompt(fields: &[&str], job_text: &str) -> String {
    let field_list = fields
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");

    // job_text goes in last so braces inside the document are never substituted.
    FIELDS_PROMPT_TEMPLATE
        .replace("{field_list}", &field_list)
        .replace("{json_rules}", JSON_ONLY_RULES)
        .replace("{job_text}", job_text)
}

pub fn intro_prompt(min_words: u32, max_words: u32, job_json: &str) -> String {
    INTRO_PROMPT_TEMPLATE
        .replace("{min_words}", &min_words.to_string())
        .replace("{max_words}", &max_words.to_string())
        .replace("{job_json}", job_json)
}
