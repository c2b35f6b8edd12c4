use agentgen::contexts::WorkflowOutcome;

/// Prints the validated implementation; a run without one prints nothing
pub fn print_validated(outcome: &WorkflowOutcome, language: &str, verbose: bool) {
    let Some(implementation) = outcome.validated() else {
        return;
    };

    let elapsed = outcome.duration().num_milliseconds() as f64 / 1000.0;
    println!("\n{}", "=".repeat(60));
    println!("Validated {} function:", language);
    println!("  Attempts:  {}/{}", outcome.attempts, outcome.max_attempts);
    println!("  Duration:  {:.2}s", elapsed);
    println!("{}", "=".repeat(60));
    println!("{}", implementation);

    if verbose {
        if let Some(test) = &outcome.artifact.test {
            println!("{}", "-".repeat(60));
            println!("{}", test);
        }
    }
}
