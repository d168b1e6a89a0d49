//! Services: external collaborators and the pure helpers around them

pub mod credibility_scorer;
pub mod gemini_client;
pub mod generation_client;
pub mod rate_limiter;
pub mod response_parser;
pub mod search_client;

pub use credibility_scorer::{score_source, score_source_at};
pub use gemini_client::GeminiClient;
pub use generation_client::{ChunkSink, GenerationClient, GenerationError, GenerationService, RetryPolicy};
pub use rate_limiter::RateLimiter;
pub use response_parser::{parse_response, parse_string_list, Parsed};
pub use search_client::{EvidenceSource, SearchResult, WebEvidenceSource};
