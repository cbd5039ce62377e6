//! hclgen cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; hclgen ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a manifest as terraform configuration
    ///
    /// Reads the manifest from stdin unless a file is provided (via --file)
    Render(RenderCommand),

    /// Print the values of every declared resource
    Inspect(InspectCommand),

    /// List the resource (or data source) types of a provider
    Schemas(SchemasCommand),
}

#[derive(Parser, Debug)]
pub struct RenderCommand {
    #[clap(flatten)]
    pub input: InputArgs,
}

#[derive(Parser, Debug)]
pub struct InspectCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct SchemasCommand {
    /// Provider schemas as written by `terraform providers schema -json`
    #[clap(short = 's', long = "schema")]
    pub schema: PathBuf,

    /// Provider type, e.g. `aws`
    pub provider: String,

    /// List data sources instead of resources
    #[clap(long = "data")]
    pub data: bool,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Provider schemas as written by `terraform providers schema -json`
    #[clap(short = 's', long = "schema")]
    pub schema: PathBuf,

    /// Manifest file (YAML or JSON)
    #[clap(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// How resources declared without a name are named
    #[arg(long = "names", default_value_t)]
    pub names: NameStyle,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum NameStyle {
    /// id_1, id_2, ...
    Sequential,
    /// id_<uuid>
    #[default]
    Random,
}

impl std::fmt::Display for NameStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NameStyle::Sequential => f.write_str("sequential"),
            NameStyle::Random => f.write_str("random"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
