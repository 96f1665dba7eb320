// Cover-letter generation: provider routing, prompt building, reply parsing
// and the pipeline that ties them to the requirement extractor.
// All provider calls go through llm_client.

pub mod handlers;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod router;
