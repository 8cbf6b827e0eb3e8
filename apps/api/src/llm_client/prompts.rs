// Shared prompt fragments. Each feature keeps its own prompts.rs next to it;
// only cross-cutting wording lives here.

/// Appended to prompts whose reply is parsed as a JSON object.
pub const JSON_ONLY_RULES: &str = "\
- Maintain JSON validity strictly: no explanations, no markdown code fences, no extra text.
- Do not infer or guess beyond the text; extract only what is clearly mentioned.";
