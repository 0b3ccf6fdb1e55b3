//! # Attrstore CLI Architecture
//!
//! The `attrstore` binary is intentionally thin: the CLI lives in `src/cli/`,
//! while this file only invokes `cli::run()` and turns the outcome into a
//! process exit code.
//!
//! ## Workspace Structure
//!
//! - `crates/attrstore/` holds the registry, column adapter and record model
//! - `crates/attrstore-cli/` is this tool, built on the `attrstore` library
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/attrstore-cli/src/cli/)                  │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Schema loading, input reading, dispatch (commands.rs)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Library (crates/attrstore/)                                │
//! │  - SchemaFile → Model → Record                              │
//! │  - Typed get / set / validate over one blob column          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The library never touches stdout, stderr or exit codes. Everything
//! user-facing happens here.
//!
//! ## Testing Approach
//!
//! `tests/cli.rs` runs the built binary against schema files written to a
//! temporary directory and checks its output and exit status.

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
