//! Generate code with a remote agent, run it, and retry until it passes
//!
//! The workflow asks an agent for a function and a test case, pulls both out of the
//! response with a configurable pattern pair, runs them with an external
//! interpreter, and tries again a bounded number of times when anything fails.

pub mod config;
pub mod contexts;
pub mod data;
pub mod registries;
