mod completion;
mod response_parser;
mod snippet_runner;

pub use completion::Completion;
pub use response_parser::{ExtractedArtifact, ResponseParser};
pub use snippet_runner::SnippetRunner;
