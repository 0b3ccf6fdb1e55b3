//! # CLI Behavior
//!
//! Every command takes a TOML schema file describing one model and its blob
//! columns, plus (for the record commands) a raw column document read from a
//! file or from stdin (`-`).
//!
//! - `attrstore names SCHEMA` lists the attribute names of a column,
//!   optionally filtered with `--type` and `--array`.
//! - `attrstore decode SCHEMA [INPUT]` prints every attribute as the getters
//!   see it, defaults included.
//! - `attrstore set SCHEMA [INPUT] --attr name=value` assigns through the
//!   setters and prints the resulting column document.
//! - `attrstore validate SCHEMA [INPUT]` runs the enum inclusion checks and
//!   exits with status 1 when any fail.
//! - `attrstore normalize SCHEMA [INPUT]` prints the document as it would be
//!   written back: keys sorted, values in canonical stored form.
//!
//! Logging goes to stderr. `ATTRSTORE_LOG` takes a `tracing` filter
//! directive; `--verbose` lowers the default level to `debug`.
//!
//! ## Module Structure
//!
//! - `commands`: context setup and one handler per command
//! - `setup`: argument parsing via clap

mod commands;
pub mod setup;

pub use commands::run;
