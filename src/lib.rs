//! `workgraph` - command-line front end for `workgraph-core`.
//!
//! This crate provides the `wg` binary: argument parsing, workspace
//! discovery, configuration, logging and output rendering. All workflow
//! rules live in the engine crate.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Workspace discovery and `config.yaml`
//! - [`format`] - Output formatting (text, JSON)
//! - [`logging`] - tracing subscriber setup

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod format;
pub mod logging;

pub use cli::Cli;
