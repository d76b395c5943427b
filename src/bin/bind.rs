//! Schema Binding CLI
//!
//! Coerces JSON input against an inline JSON Schema and renders the result as
//! a realized value, a payload envelope, a record hash or annotation groups.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use familiar_binding::{
    groups, to_hash, BindingConfig, BindingError, Exclude, Factory, Payload, Reflection, TypeRegistry, Value,
};
use regex::Regex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-bind")]
#[command(about = "Coerce, encode and inspect records against a JSON Schema")]
struct Cli {
    /// Configuration file (defaults to binding.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the reflection tree of a schema
    Reflect {
        /// JSON Schema file
        schema: PathBuf,
    },

    /// Coerce an input document and print the realized value
    Coerce {
        /// JSON Schema file
        schema: PathBuf,
        /// Input JSON file
        input: PathBuf,
        /// Print keyed by raw schema names with ISO dates
        #[arg(long)]
        object: bool,
    },

    /// Coerce an input document and print its payload envelope
    Payload {
        schema: PathBuf,
        input: PathBuf,
    },

    /// Decode a payload envelope against the registered schemas
    Decode {
        /// Payload JSON file
        payload: PathBuf,
        /// Schemas to register (repeatable)
        #[arg(short, long = "schema", required = true)]
        schemas: Vec<PathBuf>,
    },

    /// Print the hex record hash of a coerced input document
    Hash {
        schema: PathBuf,
        input: PathBuf,
        /// Exact dotted path to leave out (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Pattern of dotted paths to leave out (repeatable)
        #[arg(long = "exclude-pattern")]
        exclude_pattern: Vec<String>,
    },

    /// Print the annotation groups of a coerced input document
    Groups {
        schema: PathBuf,
        input: PathBuf,
        /// Annotation holding group names
        #[arg(long)]
        annotation: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn load_factory(registry: &mut TypeRegistry, path: &Path) -> Result<Factory> {
    let schema = Reflection::from_json_schema(&read_json(path)?)?;
    Ok(registry.factory(schema)?)
}

fn coerce_input(factory: &Factory, input: &Path) -> Result<Value> {
    let raw = Value::from(read_json(input)?);
    factory.builder().coerce(&raw).map_err(report)
}

/// One line per failing field
fn report(err: BindingError) -> anyhow::Error {
    anyhow::anyhow!("record did not coerce:\n  {}", err.lines().join("\n  "))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = BindingConfig::load_from(cli.config.as_deref().and_then(Path::to_str))
        .context("loading configuration")?;
    let mut registry = TypeRegistry::from_config(&config)?;

    match cli.command {
        Commands::Reflect { schema } => {
            let reflection = Reflection::from_json_schema(&read_json(&schema)?)?;
            print_json(&reflection)?;
        }

        Commands::Coerce { schema, input, object } => {
            let factory = load_factory(&mut registry, &schema)?;
            let value = coerce_input(&factory, &input)?;
            if object {
                print_json(&factory.to_object(&value)?)?;
            } else {
                print_json(&value)?;
            }
        }

        Commands::Payload { schema, input } => {
            let factory = load_factory(&mut registry, &schema)?;
            let value = coerce_input(&factory, &input)?;
            print_json(&factory.to_payload(&value)?)?;
        }

        Commands::Decode { payload, schemas } => {
            for schema in &schemas {
                load_factory(&mut registry, schema)?;
            }
            let payload: Payload = serde_json::from_value(read_json(&payload)?).context("reading payload envelope")?;
            let (factory, value) = registry.dispatch(&payload).map_err(report)?;
            eprintln!("✓ decoded {}", factory.type_name());
            print_json(&value)?;
        }

        Commands::Hash { schema, input, exclude, exclude_pattern } => {
            let factory = load_factory(&mut registry, &schema)?;
            let value = coerce_input(&factory, &input)?;

            let mut excludes = config.hash_excludes()?;
            excludes.extend(exclude.into_iter().map(Exclude::Path));
            for pattern in exclude_pattern {
                let regex = Regex::new(&pattern).with_context(|| format!("bad pattern {}", pattern))?;
                excludes.push(Exclude::Pattern(regex));
            }
            println!("{}", to_hash(&factory.getter(&value), &excludes));
        }

        Commands::Groups { schema, input, annotation } => {
            let factory = load_factory(&mut registry, &schema)?;
            let value = coerce_input(&factory, &input)?;
            let annotation = annotation.unwrap_or_else(|| config.group_annotation().to_string());
            print_json(&groups(&factory.getter(&value), &annotation))?;
        }
    }

    Ok(())
}
