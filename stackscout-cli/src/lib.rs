//! StackScout command-line interface.
//!
//! Runs the collection pipeline in-process for one-shot work:
//!
//! - `collect`: fetch, normalize, score and print a single package or image
//! - `scan`: run a scan job across the configured worker pool and wait for it
//! - `config`: validate or print the effective configuration
//!
//! Long-running collection belongs to `stackscout-daemon`.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
