//! CLI module for thicket - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for set and feature
//! management, multi-repo status/sync/exec, and shell integration.

pub mod commands;

pub use commands::Cli;
