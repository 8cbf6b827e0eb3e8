// Job description understanding: structured field extraction and the
// spoken introduction built from it. All model calls go through llm_client.

pub mod fields;
pub mod intro;
pub mod prompts;
