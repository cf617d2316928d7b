//! Source parsing and artifact extraction

pub mod config;
pub mod extractor;
pub mod languages;
pub mod parser_pool;


pub use config::ExtractorRules;
pub use extractor::{ArtifactExtractor, ExtractError, Extraction};
pub use languages::rust::RustExtractor;
pub use parser_pool::{create_parser_pool, ParseRequest, ParseResult, ParserPool};
