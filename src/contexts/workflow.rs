use crate::data::{Completion, ExtractedArtifact, ResponseParser, SnippetRunner};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Attempt bookkeeping for one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempt: usize,
    max_attempts: usize,
    needs_retry: bool,
}

impl RetryState {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            needs_retry: true,
        }
    }

    pub fn should_continue(&self) -> bool {
        self.attempt < self.max_attempts && self.needs_retry
    }

    /// Consumes one attempt and returns its 1-based number
    fn begin_attempt(&mut self) -> usize {
        self.attempt += 1;
        self.attempt
    }

    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn needs_retry(&self) -> bool {
        self.needs_retry
    }
}

/// What a finished workflow run produced
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    /// The query as sent to the agent, suffix included
    pub query: String,
    pub attempts: usize,
    pub max_attempts: usize,
    pub needs_retry: bool,
    /// The artifact from the last attempt that got a response
    pub artifact: ExtractedArtifact,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WorkflowOutcome {
    /// The implementation that ran cleanly together with its test, if any
    pub fn validated(&self) -> Option<&str> {
        if self.needs_retry {
            None
        } else {
            self.artifact.implementation.as_deref()
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Workflow context: generate, extract, execute, and retry until the artifact runs
/// or the attempt bound is used up.
///
/// Every failure (no response, unreadable response, failing code) consumes one
/// attempt and the loop simply tries again with the same query. Nothing is
/// returned as an error.
pub struct Workflow<C, P, R>
where
    C: Completion,
    P: ResponseParser,
    R: SnippetRunner,
{
    /// Remote agent producing the code
    client: C,
    /// Pulls implementation and test out of the response
    parser: P,
    /// Runs the extracted snippets
    runner: R,
    /// Target language named in the query suffix
    language: String,
    max_attempts: usize,
}

impl<C, P, R> Workflow<C, P, R>
where
    C: Completion,
    P: ResponseParser,
    R: SnippetRunner,
{
    /// Creates a new Workflow context
    ///
    /// # Arguments
    /// * `client` - The agent client
    /// * `parser` - The response parser
    /// * `runner` - The snippet runner
    /// * `language` - Language appended to the query ("... in JavaScript")
    /// * `max_attempts` - Upper bound on agent calls for one query
    pub fn new(
        client: C,
        parser: P,
        runner: R,
        language: impl Into<String>,
        max_attempts: usize,
    ) -> Self {
        Self {
            client,
            parser,
            runner,
            language: language.into(),
            max_attempts,
        }
    }

    /// Appends the target language to the raw query
    pub fn prepare_query(&self, query: &str) -> String {
        format!("{} in {}", query, self.language)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs the bounded retry loop for `query`
    pub fn run(&self, query: &str) -> WorkflowOutcome {
        let started_at = Utc::now();
        let query = self.prepare_query(query);

        tracing::info!("### ENTER WORKFLOW");

        let mut state = RetryState::new(self.max_attempts);
        let mut artifact = ExtractedArtifact::default();

        while state.should_continue() {
            let attempt = state.begin_attempt();
            tracing::info!("TRY # {} of {}", attempt, self.max_attempts);
            tracing::info!("### Run {} agent", self.language);

            let Some(response) = self.client.complete(&query) else {
                tracing::warn!("Result is None. Skipping this iteration.");
                continue;
            };

            artifact = self.parser.extract(Some(&response));
            state.needs_retry = artifact.needs_retry();

            match artifact.parts() {
                Some((implementation, test)) => {
                    state.needs_retry = self.runner.execute(implementation, test);
                }
                None => {
                    tracing::warn!("Skipping code check due to missing function or test case.");
                }
            }
        }

        if !state.needs_retry() {
            if let Some(implementation) = &artifact.implementation {
                tracing::info!(
                    "Validated {} function: ```{}```",
                    self.language,
                    implementation
                );
            }
        }
        tracing::info!("### EXIT WORKFLOW");

        WorkflowOutcome {
            query,
            attempts: state.attempt(),
            max_attempts: self.max_attempts,
            needs_retry: state.needs_retry(),
            artifact,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
