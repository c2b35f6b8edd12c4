mod agent_client;
mod code_executor;
mod pattern_extractor;
mod workflow;

pub use agent_client::{AgentClientError, MistralAgentClient};
pub use code_executor::{CodeExecutor, ExecutionError, SnippetRole};
pub use pattern_extractor::{PatternExtractor, ResponseFormat};
pub use workflow::{RetryState, Workflow, WorkflowOutcome};
