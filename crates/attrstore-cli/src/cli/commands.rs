//! # CLI Layer
//!
//! The only place that reads files or stdin, prints, or picks an exit code.
//! Each handler loads the schema into a [`Model`], feeds the raw column
//! document to a [`Record`] exactly as a table row would, and reports what
//! the library makes of it.

use super::setup::{Cli, ColumnArgs, Commands, InputArgs};
use anyhow::{anyhow, bail, Context, Result};
use attrstore::column::JsonEncoding;
use attrstore::schema::SchemaFile;
use attrstore::{AttrValue, AttrstoreConfig, BuiltinTypes, Model, Record, Row};
use clap::Parser;
use serde_json::Value as Json;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AttrstoreConfig::load(cli.config.as_deref())?;
    debug!(?config, "settings loaded");

    match cli.command {
        Commands::Names {
            column,
            type_filter,
            array,
        } => {
            let ctx = AppContext::load(&column, config)?;
            handle_names(&ctx, type_filter.as_deref(), array)
        }
        Commands::Decode { column, input } => {
            let ctx = AppContext::load(&column, config)?;
            handle_decode(&ctx, &input)
        }
        Commands::Set {
            column,
            input,
            attrs,
        } => {
            let ctx = AppContext::load(&column, config)?;
            handle_set(&ctx, &input, &attrs)
        }
        Commands::Validate { column, input } => {
            let ctx = AppContext::load(&column, config)?;
            handle_validate(&ctx, &input)
        }
        Commands::Normalize { column, input } => {
            let ctx = AppContext::load(&column, config)?;
            handle_normalize(&ctx, &input)
        }
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("ATTRSTORE_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

struct AppContext {
    model: Arc<Model>,
    column: String,
    encoding: JsonEncoding,
}

impl AppContext {
    fn load(args: &ColumnArgs, config: AttrstoreConfig) -> Result<Self> {
        let schema = SchemaFile::from_path(&args.schema)?;

        let section = match &args.column {
            Some(name) => schema.column(name).ok_or_else(|| {
                anyhow!(
                    "Column '{}' is not declared in {}",
                    name,
                    args.schema.display()
                )
            })?,
            None => schema
                .columns
                .iter()
                .find(|column| !column.attributes.is_empty())
                .ok_or_else(|| {
                    anyhow!("{} declares no serialized attributes", args.schema.display())
                })?,
        };
        let column = section.name.clone();
        let encoding = section.encoding;

        let model = schema.build_model(Arc::new(BuiltinTypes::new()), config)?;
        debug!(model = model.name(), column = %column, "schema loaded");

        Ok(Self {
            model: Arc::new(model),
            column,
            encoding,
        })
    }

    /// Load the document as the persisted value of the column.
    fn record(&self, input: &InputArgs) -> Result<Record> {
        let text = read_input(&input.input)?;
        let raw = match self.encoding {
            JsonEncoding::Native if text.trim().is_empty() => Json::Null,
            JsonEncoding::Native => serde_json::from_str(&text)
                .with_context(|| format!("Input is not JSON: {}", input.input.display()))?,
            JsonEncoding::Text => Json::String(text.trim_end().to_string()),
        };

        let mut row = Row::new();
        row.insert(self.column.clone(), raw);
        Ok(Record::load(&self.model, Uuid::nil(), &row)?)
    }

    /// The column as it would be written back.
    fn stored_document(&self, record: &Record) -> Result<String> {
        let mut row = record.to_row()?;
        let raw = row.remove(&self.column).unwrap_or(Json::Null);
        Ok(match raw {
            Json::String(text) if self.encoding == JsonEncoding::Text => text,
            other => serde_json::to_string_pretty(&other)?,
        })
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// `name=value`, with the value read as JSON when it parses.
fn parse_assignment(assignment: &str) -> Result<(&str, AttrValue)> {
    let Some((name, value)) = assignment.split_once('=') else {
        bail!("Expected NAME=VALUE, got '{}'", assignment);
    };
    let json = serde_json::from_str(value).unwrap_or_else(|_| Json::String(value.to_string()));
    Ok((name.trim(), AttrValue::from_json(&json)))
}

fn handle_names(
    ctx: &AppContext,
    type_filter: Option<&str>,
    array: Option<bool>,
) -> Result<ExitCode> {
    for name in ctx.model.attribute_names_on(&ctx.column, type_filter, array)? {
        println!("{}", name);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_decode(ctx: &AppContext, input: &InputArgs) -> Result<ExitCode> {
    let record = ctx.record(input)?;
    let store = ctx.model.store(&ctx.column)?;

    let mut decoded = serde_json::Map::new();
    for (name, value) in record.serialized_attributes_on(&ctx.column)? {
        let json = store.serialize(&name, &value)?;
        decoded.insert(name, json);
    }
    println!("{}", serde_json::to_string_pretty(&Json::Object(decoded))?);
    Ok(ExitCode::SUCCESS)
}

fn handle_set(ctx: &AppContext, input: &InputArgs, attrs: &[String]) -> Result<ExitCode> {
    let mut record = ctx.record(input)?;
    for assignment in attrs {
        let (name, value) = parse_assignment(assignment)?;
        let accessor = ctx.model.accessor(name)?;
        if accessor.column() != ctx.column {
            bail!(
                "Attribute '{}' is stored in column '{}', not '{}'",
                name,
                accessor.column(),
                ctx.column
            );
        }
        debug!(attribute = name, %value, "assigning");
        record.set(name, value)?;
    }
    println!("{}", ctx.stored_document(&record)?);
    Ok(ExitCode::SUCCESS)
}

fn handle_validate(ctx: &AppContext, input: &InputArgs) -> Result<ExitCode> {
    let mut record = ctx.record(input)?;
    if record.validate()? {
        println!("valid");
        return Ok(ExitCode::SUCCESS);
    }
    for message in record.errors().full_messages() {
        println!("{}", message);
    }
    Ok(ExitCode::from(1))
}

fn handle_normalize(ctx: &AppContext, input: &InputArgs) -> Result<ExitCode> {
    let record = ctx.record(input)?;
    println!("{}", ctx.stored_document(&record)?);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_values_parse_as_json_first() {
        let (name, value) = parse_assignment("flag=true").unwrap();
        assert_eq!(name, "flag");
        assert_eq!(value, AttrValue::Bool(true));

        let (_, value) = parse_assignment("tags=[\"a\",\"b\"]").unwrap();
        assert_eq!(value, AttrValue::List(vec!["a".into(), "b".into()]));

        let (_, value) = parse_assignment("stringy=hello world").unwrap();
        assert_eq!(value, AttrValue::from("hello world"));

        let (_, value) = parse_assignment("status=null").unwrap();
        assert_eq!(value, AttrValue::Null);
    }

    #[test]
    fn assignment_needs_an_equals_sign() {
        let err = parse_assignment("flag").unwrap_err();
        assert!(err.to_string().contains("NAME=VALUE"));
    }
}
