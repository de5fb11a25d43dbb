// CV analysis: evaluate the flattened résumé, optimize it, evaluate the result.
// All LLM calls go through llm_client — no direct provider calls here.

pub mod handlers;
pub mod orchestrator;
pub mod prompts;
