/// Trait for running an implementation snippet and its test with an external interpreter.
pub trait SnippetRunner {
    /// Runs `implementation`, then `test`.
    ///
    /// # Returns
    /// * `false` - Both snippets ran to completion with exit status 0
    /// * `true` - Anything failed and the artifact must be retried
    ///
    /// # Notes
    /// Failures are logged by the implementation and never returned as errors.
    fn execute(&self, implementation: &str, test: &str) -> bool;
}
