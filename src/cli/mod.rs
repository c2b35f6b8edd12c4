use anyhow::{Context, Result};
use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

mod summary;

use agentgen::config::{DEFAULT_LANGUAGE, Settings};
use agentgen::contexts::{CodeExecutor, MistralAgentClient, SnippetRole, Workflow};
use agentgen::registries::FilePatternRegistry;

#[derive(Clone, Copy)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
}

/// Used when no request is given on the command line or at the prompt
pub const DEFAULT_QUERY: &str = "How can I remove duplicates from a list";

/// Per-run overrides for values otherwise taken from the environment
#[derive(Args, Debug, Default)]
pub struct RunOptions {
    #[arg(long, help = "Response format used to extract code (fenced, labeled, or a registry entry)")]
    pub format: Option<String>,

    #[arg(long, help = "Pattern registry file (defaults to agentgen/patterns.yml)")]
    pub patterns: Option<PathBuf>,

    #[arg(long, value_parser = clap::value_parser!(u64).range(1..), help = "Maximum number of agent calls")]
    pub max_retries: Option<u64>,

    #[arg(long, help = "Target language named in the request")]
    pub language: Option<String>,

    #[arg(long, help = "Interpreter used to run the generated code")]
    pub interpreter: Option<String>,

    #[arg(long, help = "Extension of the transient snippet files")]
    pub extension: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u64).range(1..), help = "Seconds each snippet may run before it is killed")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Directory for the transient snippet files (defaults to the current directory)")]
    pub work_dir: Option<PathBuf>,

    #[arg(long, help = "Print the workflow outcome as JSON")]
    pub json: bool,
}

impl RunOptions {
    fn apply(&self, settings: &mut Settings) {
        if let Some(format) = &self.format {
            settings.format = format.clone();
        }
        if let Some(max_retries) = self.max_retries {
            settings.max_retries = max_retries as usize;
        }
        if let Some(language) = &self.language {
            settings.language = language.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            settings.interpreter = interpreter.clone();
        }
        if let Some(extension) = &self.extension {
            settings.extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(timeout) = self.timeout {
            settings.exec_timeout = Duration::from_secs(timeout);
        }
    }
}

/// Runs the generate/extract/execute workflow for one request
///
/// Exhausting the retries is not an error: the run ends quietly and only a
/// successful run prints the validated implementation.
pub fn run(query: Option<String>, options: &RunOptions, config: &Config) -> Result<()> {
    let mut settings = Settings::load().context("Failed to load settings")?;
    options.apply(&mut settings);

    tracing::debug!("Settings: {:?}", settings);

    let query = match query {
        Some(query) => query,
        None => prompt_for_query()?,
    };
    let query = match query.trim() {
        "" => DEFAULT_QUERY.to_string(),
        trimmed => trimmed.to_string(),
    };

    let registry = FilePatternRegistry::new(options.patterns.clone(), &settings.language);
    let extractor = registry
        .extractor(&settings.format)
        .with_context(|| format!("Failed to load response format '{}'", settings.format))?;

    let executor = CodeExecutor::new(
        settings.interpreter.clone(),
        settings.extension.clone(),
        options.work_dir.clone(),
        settings.exec_timeout,
    );

    if config.dry_run {
        println!("Dry run: nothing will be sent or executed");
        println!("  Query:       {} in {}", query, settings.language);
        println!("  Target:      {} at {}", settings.target, settings.api_base);
        println!("  Format:      {}", settings.format);
        println!("  Impl regex:  {}", extractor.implementation_pattern());
        println!("  Test regex:  {}", extractor.test_pattern());
        println!(
            "  Interpreter: {} ({}, {})",
            settings.interpreter,
            executor.path_for(SnippetRole::Implementation).display(),
            executor.path_for(SnippetRole::Test).display()
        );
        println!("  Attempts:    {}", settings.max_retries);
        println!("  Timeout:     {}s", settings.exec_timeout.as_secs());
        return Ok(());
    }

    let client = MistralAgentClient::new(&settings).context("Failed to create agent client")?;
    let workflow = Workflow::new(
        client,
        extractor,
        executor,
        settings.language.clone(),
        settings.max_retries,
    );

    let outcome = workflow.run(&query);

    if options.json {
        let json = serde_json::to_string_pretty(&outcome)
            .context("Failed to serialize workflow outcome")?;
        println!("{}", json);
    } else {
        summary::print_validated(&outcome, &settings.language, config.verbose);
    }

    Ok(())
}

/// Prints every response format the registry knows about
pub fn formats(patterns: Option<PathBuf>, language: Option<String>) -> Result<()> {
    let language = language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let registry = FilePatternRegistry::new(patterns, &language);
    let formats = registry.formats().context("Failed to load pattern registry")?;

    for (name, pair) in formats {
        println!("{}", name);
        println!("  implementation: {}", pair.implementation);
        println!("  test:           {}", pair.test);
    }

    Ok(())
}

fn prompt_for_query() -> Result<String> {
    print!("Enter your request (empty for \"{}\"): ", DEFAULT_QUERY);
    io::stdout().flush().context("Failed to flush prompt")?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;

    Ok(input)
}
