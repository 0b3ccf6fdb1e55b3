use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "attrstore",
    bin_name = "attrstore",
    version,
    disable_help_subcommand = true
)]
#[command(
    about = "Inspect typed attributes stored in a JSON blob column",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (TOML); environment variables override it
    #[arg(short, long, global = true, help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

/// Schema file and the column to work on.
#[derive(Args, Debug, Clone)]
pub struct ColumnArgs {
    /// Schema file describing the model (TOML)
    pub schema: PathBuf,

    /// Blob column to work on; defaults to the first column with attributes
    #[arg(long)]
    pub column: Option<String>,
}

/// A raw column document to read.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// File holding the raw column value, or `-` for stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List attribute names declared on a column
    #[command(alias = "ls")]
    Names {
        #[command(flatten)]
        column: ColumnArgs,

        /// Only attributes of this type identifier
        #[arg(long = "type", value_name = "TYPE")]
        type_filter: Option<String>,

        /// Only array (`true`) or only scalar (`false`) attributes
        #[arg(long)]
        array: Option<bool>,
    },

    /// Print every attribute of a stored document, defaults filled in
    Decode {
        #[command(flatten)]
        column: ColumnArgs,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Assign attributes and print the document that would be stored
    Set {
        #[command(flatten)]
        column: ColumnArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Assignment as `name=value`; the value is read as JSON, else as a string
        #[arg(short, long = "attr", value_name = "NAME=VALUE", required = true)]
        attrs: Vec<String>,
    },

    /// Check enum attributes against their allowed options
    Validate {
        #[command(flatten)]
        column: ColumnArgs,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Print a stored document in canonical form
    Normalize {
        #[command(flatten)]
        column: ColumnArgs,

        #[command(flatten)]
        input: InputArgs,
    },
}
