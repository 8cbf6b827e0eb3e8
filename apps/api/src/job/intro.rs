//! Introduction script generation: a short spoken-style overview of the job.

use tracing::{info, warn};

use crate::errors::StageError;
use crate::job::fields::JobRecord;
use crate::job::prompts::intro_prompt;
use crate::llm_client::{CompletionOptions, LlmClient};

// Higher temperature and token ceiling than field extraction: this is prose.
const INTRO_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.7,
    max_tokens: 400,
};

/// Target length of the introduction, in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordTarget {
    pub min: u32,
    pub max: u32,
}

pub async fn generate_intro(
    record: &JobRecord,
    llm: &LlmClient,
    words: WordTarget,
) -> Result<String, StageError> {
    let prompt = intro_prompt(words.min, words.max, &record.to_pretty_json());

    let intro = llm
        .complete(&prompt, INTRO_OPTIONS)
        .await
        .map_err(|e| {
            warn!("Introduction request failed: {e}");
            StageError::transport(e.to_string())
        })?
        .trim()
        .to_string();

    let count = word_count(&intro);
    if count < words.min as usize || count > words.max as usize {
        // Length is a prompt target, not a contract.
        warn!(
            "Introduction has {count} words, outside the {}-{} target",
            words.min, words.max
        );
    } else {
        info!("Generated introduction ({count} words)");
    }
    Ok(intro)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
