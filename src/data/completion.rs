/// Completion trait for sending a single prompt to a remote language-model agent.
///
/// Implementations must not propagate transport or service failures to the caller.
pub trait Completion {
    /// Sends `query` as a single user message and returns the response text.
    ///
    /// # Arguments
    /// * `query` - The prompt to send
    ///
    /// # Returns
    /// * `Some(String)` - The content of the first choice
    /// * `None` - If the call failed for any reason (the failure is logged, not returned)
    fn complete(&self, query: &str) -> Option<String>;
}
