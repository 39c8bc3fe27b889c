use crate::errors::CliError;
use clap::{Parser, ValueEnum};
use curator_catalogue::{default_reader, get_file_list_expander, EventFileReader, DEFAULT_EXPANDER};
use curator_config::Config;
use curator_logger as logger;
use curator_manifest::{
    add_meta, curate, write_yaml, CurateInput, UserFunctionRegistry, WriteOptions,
};
use serde_yaml::Value;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventType {
    Data,
    Mc,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Data => "data",
            EventType::Mc => "mc",
        }
    }
}

/// Parse `KEY=VALUE`; the value is read as a YAML scalar
pub fn parse_meta(raw: &str) -> Result<(String, Value), CliError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(CliError::InvalidMeta(raw.to_string()));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::InvalidMeta(raw.to_string()));
    }
    let value = serde_yaml::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn parse_meta_arg(raw: &str) -> Result<(String, Value), String> {
    parse_meta(raw).map_err(|e| e.to_string())
}

#[derive(Parser, Debug, Clone)]
pub struct CompileCommand {
    /// Files or glob patterns making up the dataset
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<String>,

    /// Name of the dataset
    #[arg(short, long)]
    pub dataset: String,

    #[arg(long, value_enum, default_value = "data")]
    pub event_type: EventType,

    /// Manifest to write
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Replace an existing output file
    #[arg(long, conflicts_with = "append")]
    pub overwrite: bool,

    /// Add the dataset to an existing output file
    #[arg(long)]
    pub append: bool,

    /// Extra metadata for the dataset, KEY=VALUE
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_meta_arg)]
    pub meta: Vec<(String, Value)>,

    /// Post-process the dataset with a named function
    #[arg(long, value_name = "NAME")]
    pub user_function: Option<String>,

    /// File list expander (xrootd, local)
    #[arg(long)]
    pub expander: Option<String>,

    /// Prefix joined onto relative file patterns
    #[arg(long)]
    pub prefix: Option<String>,

    /// Write every field on every dataset instead of a defaults block
    #[arg(long)]
    pub no_defaults: bool,

    /// Record per-branch file counts
    #[arg(long)]
    pub include_branches: bool,

    /// Skip local files that cannot be opened
    #[arg(long)]
    pub ignore_inaccessible: bool,
}

impl CompileCommand {
    /// Settings from the command line, falling back to the config file
    fn curate_input(&self, config: &Config) -> CurateInput {
        let expander = self
            .expander
            .clone()
            .or_else(|| config.default_expander.clone())
            .unwrap_or_else(|| DEFAULT_EXPANDER.to_string());
        let mut input = CurateInput::new(self.files.clone())
            .with_event_type(self.event_type.as_str())
            .with_expander(expander);
        input.prefix = self.prefix.clone().filter(|p| !p.is_empty());
        input.include_branches = self.include_branches || config.include_branches.unwrap_or(false);
        input.ignore_inaccessible =
            self.ignore_inaccessible || config.ignore_inaccessible.unwrap_or(false);
        input
    }

    fn write_options(&self, config: &Config) -> WriteOptions {
        WriteOptions {
            append: self.append && !self.overwrite,
            no_defaults_in_output: self.no_defaults || config.no_defaults_in_output.unwrap_or(false),
        }
    }

    /// Everything that can be rejected before a data file is opened
    fn validate(&self, registry: &UserFunctionRegistry) -> Result<(), CliError> {
        if let Some(name) = &self.user_function {
            registry.get(name)?;
        }
        if self.output.exists() && !self.overwrite && !self.append {
            return Err(CliError::OutputExists(self.output.clone()));
        }
        Ok(())
    }
}

pub fn handle_compile(cmd: CompileCommand, config: &Config) -> Result<PathBuf, CliError> {
    let reader = default_reader()?;
    handle_compile_with(reader.as_ref(), cmd, config)
}

/// Compile one dataset with the given reader and write it out
pub fn handle_compile_with(
    reader: &dyn EventFileReader,
    cmd: CompileCommand,
    config: &Config,
) -> Result<PathBuf, CliError> {
    let registry = UserFunctionRegistry::default();
    cmd.validate(&registry)?;

    let input = cmd.curate_input(config);
    get_file_list_expander(&input.expander)?;
    logger::step(&format!(
        "Using expander '{}' and reader '{}'",
        input.expander,
        reader.name()
    ));

    logger::spinner_start(&format!("Compiling dataset '{}'", cmd.dataset));
    let dataset = match curate(reader, &cmd.dataset, &input) {
        Ok(dataset) => dataset,
        Err(e) => {
            logger::spinner_error(&format!("Failed to compile '{}'", cmd.dataset));
            return Err(e.into());
        }
    };
    logger::spinner_success(&format!(
        "Dataset '{}' has {} file(s)",
        cmd.dataset,
        dataset.files.len()
    ));

    let dataset = match &cmd.user_function {
        Some(name) => {
            logger::info(&format!("Applying user function '{}'", name));
            registry.apply(name, dataset)?
        }
        None => dataset,
    };

    let mut mapping = dataset.to_mapping()?;
    add_meta(&mut mapping, &cmd.meta)?;

    let written = write_yaml(vec![mapping], &cmd.output, cmd.write_options(config))?;
    debug!("Wrote {}", written.display());
    logger::success(&format!(
        "Dataset '{}' written to {}",
        cmd.dataset,
        written.display()
    ));
    Ok(written)
}
