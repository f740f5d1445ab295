mod config;
mod logging;

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{ArgAction, Args, Parser, Subcommand};
use modelsmith_codegen::{CodeGenerator, CodegenError, ForcedRelationship, GeneratorOptions};
use modelsmith_core::{DatabaseSchema, Error as CoreError, snapshot_json_schema, validate_schema};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Codegen(#[from] CodegenError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("logging error: {0}")]
    Logging(String),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(
    name = "modelsmith",
    version,
    about = "Generate SQLAlchemy declarative models from a schema snapshot"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render model source from a schema.json snapshot.
    Generate(GenerateArgs),
    /// Print the JSON Schema of the snapshot contract.
    SchemaJson(SchemaJsonArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Path to the schema.json snapshot.
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,
    /// TOML file with generator options; flags below take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Namespace to render; rendered into every declaration when given.
    #[arg(long)]
    schema: Option<String>,
    /// Tables to process (comma-delimited, default: all).
    #[arg(long, value_delimiter = ',')]
    tables: Vec<String>,
    /// Ignore views.
    #[arg(long = "noviews", default_value_t = false)]
    no_views: bool,
    /// Ignore indexes.
    #[arg(long = "noindexes", default_value_t = false)]
    no_indexes: bool,
    /// Ignore constraints.
    #[arg(long = "noconstraints", default_value_t = false)]
    no_constraints: bool,
    /// Don't autodetect joined table inheritance.
    #[arg(long = "nojoined", default_value_t = false)]
    no_joined: bool,
    /// Don't try to convert table names to singular form.
    #[arg(long = "noinflect", default_value_t = false)]
    no_inflect: bool,
    /// Don't generate classes, only tables.
    #[arg(long = "noclasses", default_value_t = false)]
    no_classes: bool,
    /// Don't generate back-references.
    #[arg(long = "nobackrefs", default_value_t = false)]
    no_backrefs: bool,
    /// Drop back-references already covered by a forced relationship.
    #[arg(long, default_value_t = false)]
    suppress_forced_backrefs: bool,
    /// File to write output to (default: stdout).
    #[arg(long = "outfile")]
    outfile: Option<PathBuf>,
    /// Tables to audit (comma-delimited).
    #[arg(long, value_delimiter = ',')]
    audited: Vec<String>,
    /// Audit every mapped class.
    #[arg(long = "auditall", default_value_t = false)]
    audit_all: bool,
    /// Force a relationship: source table, target table, attribute name and
    /// a JSON object of relationship arguments.
    #[arg(
        long = "relationship",
        num_args = 4,
        value_names = ["PARENT", "CHILD", "NAME", "KWARGS"],
        action = ArgAction::Append
    )]
    relationship: Vec<String>,
    /// Table whose class gets the login user mixin.
    #[arg(long = "loginuser")]
    login_user: Option<String>,
    /// Table whose class gets the login role mixin.
    #[arg(long = "loginrole")]
    login_role: Option<String>,
}

#[derive(Args, Debug)]
struct SchemaJsonArgs {
    /// Write to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json)?;

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::SchemaJson(args) => run_schema_json(args),
    }
}

fn run_generate(args: GenerateArgs) -> CliResult<()> {
    let timer = Instant::now();
    let options = resolve_options(&args)?;
    let generator = CodeGenerator::new(options)?;

    tracing::info!(event = "run_started", snapshot = %args.snapshot.display());
    let content = std::fs::read_to_string(&args.snapshot)?;
    let schema: DatabaseSchema = serde_json::from_str(&content)?;
    validate_schema(&schema)?;
    tracing::info!(
        event = "snapshot_loaded",
        engine = %schema.engine,
        schemas = schema.schemas.len()
    );

    let module = generator.generate(&schema)?;
    write_output(args.outfile.as_deref(), module.source.as_bytes())?;

    tracing::info!(
        event = "run_finished",
        status = "success",
        warnings = module.warnings.len(),
        duration_ms = timer.elapsed().as_millis() as u64
    );
    Ok(())
}

fn run_schema_json(args: SchemaJsonArgs) -> CliResult<()> {
    let mut encoded = serde_json::to_string_pretty(&snapshot_json_schema())?;
    encoded.push('\n');
    write_output(args.out.as_deref(), encoded.as_bytes())
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> CliResult<()> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes)?;
            tracing::info!(event = "output_written", path = %path.display(), bytes = bytes.len());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Config file first, then flags. Switch flags only ever turn features off.
fn resolve_options(args: &GenerateArgs) -> CliResult<GeneratorOptions> {
    let mut options = match &args.config {
        Some(path) => config::load_options(path)?,
        None => GeneratorOptions::default(),
    };

    if let Some(schema) = &args.schema {
        options.schema = Some(schema.clone());
    }
    if !args.tables.is_empty() {
        options.tables = Some(args.tables.clone());
    }
    options.include_views &= !args.no_views;
    options.include_indexes &= !args.no_indexes;
    options.include_constraints &= !args.no_constraints;
    options.detect_inheritance &= !args.no_joined;
    options.inflect &= !args.no_inflect;
    options.generate_classes &= !args.no_classes;
    options.backrefs.enabled &= !args.no_backrefs;
    options.backrefs.suppress_when_forced |= args.suppress_forced_backrefs;
    options.audited.extend(args.audited.iter().cloned());
    options.audit_all |= args.audit_all;
    if let Some(table) = &args.login_user {
        options.login_user = Some(table.clone());
    }
    if let Some(table) = &args.login_role {
        options.login_role = Some(table.clone());
    }
    options
        .relationships
        .extend(parse_relationships(&args.relationship)?);

    Ok(options)
}

fn parse_relationships(values: &[String]) -> CliResult<Vec<ForcedRelationship>> {
    values
        .chunks(4)
        .map(|chunk| {
            let [source, target, name, kwargs] = chunk else {
                return Err(CliError::InvalidArgument(
                    "--relationship takes PARENT CHILD NAME KWARGS".to_string(),
                ));
            };
            let options: BTreeMap<String, Value> = if kwargs.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(kwargs).map_err(|err| {
                    CliError::InvalidArgument(format!(
                        "relationship {name} arguments must be a JSON object: {err}"
                    ))
                })?
            };
            Ok(ForcedRelationship {
                source: source.clone(),
                target: target.clone(),
                name: name.clone(),
                options,
            })
        })
        .collect()
}
