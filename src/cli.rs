//! Command line surface: clap options for the binary and the command
//! grammar of the interactive studio session.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    error::{GenAIError, Result},
    logger::{LogLevel, LoggerConfig},
    models::{AspectRatio, GenerationResult, ImageSize, ModelTier},
};

#[derive(Parser, Debug)]
#[clap(name = "cinegen", version, about = "Cinematic portrait generation with Gemini image models")]
pub struct CliOptions {
    #[clap(long, short, action = clap::ArgAction::Count, global = true)]
    /// More log output; repeat for trace level.
    pub verbose: u8,

    #[clap(long, short, global = true)]
    /// Only log warnings and errors.
    pub quiet: bool,

    #[clap(long, global = true, env = "CINEGEN_JSON_LOGS")]
    /// Emit logs as JSON lines. Env: CINEGEN_JSON_LOGS
    pub json_logs: bool,

    #[clap(long, global = true, env = "CINEGEN_LOG_FILE")]
    /// Also append logs to this file. Env: CINEGEN_LOG_FILE
    pub log_file: Option<String>,

    #[clap(long, global = true, value_enum)]
    /// Logging preset: dev (debug level, file locations) or prod (JSON lines, also written to cinegen.log).
    pub log_preset: Option<LogPreset>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogPreset {
    Dev,
    Prod,
}

impl CliOptions {
    /// Logger settings: the preset first, then explicit flags on top.
    pub fn logger_config(&self) -> LoggerConfig {
        let mut config = match self.log_preset {
            Some(LogPreset::Dev) => LoggerConfig::development(),
            Some(LogPreset::Prod) => LoggerConfig::production(),
            None => LoggerConfig::new(),
        };
        if self.verbose > 0 || self.quiet {
            config = config.with_level(LogLevel::from_verbosity(self.verbose, self.quiet));
        }
        if self.json_logs {
            config = config.with_json_output(true);
        }
        if let Some(path) = &self.log_file {
            config = config.with_file_output(path);
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the supported model tiers.
    Models,

    /// Generate one image and save it as a PNG.
    Generate(GenerateArgs),

    /// Interactive session with a result history.
    Studio(SessionArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct GenerateArgs {
    #[clap(long, short)]
    /// Model tier: flash or pro.
    pub model: Option<ModelTier>,

    #[clap(long, short)]
    /// One of 1:1, 3:4, 4:3, 9:16, 16:9.
    pub aspect_ratio: Option<AspectRatio>,

    #[clap(long, short)]
    /// Output resolution for the pro tier: 1K, 2K or 4K.
    pub size: Option<ImageSize>,

    #[clap(long, short)]
    /// Reference portrait to keep the subject's likeness from.
    pub reference: Option<PathBuf>,

    #[clap(long)]
    /// Replace the built-in cinematic prompt.
    pub prompt: Option<String>,

    #[clap(long, short)]
    /// Directory the PNG is written to.
    pub output: Option<PathBuf>,

    #[clap(long)]
    /// Ask for an API key on the terminal instead of reading the environment.
    pub ask_key: bool,
}

#[derive(clap::Args, Debug, Default)]
pub struct SessionArgs {
    #[clap(long, short)]
    pub model: Option<ModelTier>,

    #[clap(long, short)]
    pub reference: Option<PathBuf>,

    #[clap(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioCommand {
    Generate,
    Model(ModelTier),
    Ratio(AspectRatio),
    Size(ImageSize),
    Reference(PathBuf),
    ClearReference,
    History,
    Select(usize),
    Save(Option<PathBuf>),
    Status,
    Models,
    Help,
    Quit,
}

pub const STUDIO_HELP: &str = "\
commands:
  generate | g          render with the current controls
  model <flash|pro>     switch engine
  ratio <1:1|3:4|4:3|9:16|16:9>
  size <1K|2K|4K>       output resolution (pro only)
  reference <path>      load a reference portrait
  reference clear       drop the reference portrait
  history | h           list results, most recent first
  select <n>            bring history entry n to the front
  save [dir]            write the current image as PNG
  status                show current controls
  models                list model tiers
  quit | q";

impl StudioCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match (head.to_ascii_lowercase().as_str(), arg) {
            ("generate" | "g" | "gen", None) => StudioCommand::Generate,
            ("model", Some(model)) => StudioCommand::Model(model.parse()?),
            ("ratio" | "aspect", Some(ratio)) => StudioCommand::Ratio(ratio.parse()?),
            ("size", Some(size)) => StudioCommand::Size(size.parse()?),
            ("reference" | "ref", Some("clear" | "none")) => StudioCommand::ClearReference,
            ("reference" | "ref", Some(path)) => StudioCommand::Reference(PathBuf::from(path)),
            ("history" | "h", None) => StudioCommand::History,
            ("select" | "s", Some(index)) => {
                let index = index.parse().map_err(|_| {
                    GenAIError::InvalidRequest(format!("'{}' is not a history index", index))
                })?;
                StudioCommand::Select(index)
            }
            ("save", dir) => StudioCommand::Save(dir.map(PathBuf::from)),
            ("status", None) => StudioCommand::Status,
            ("models", None) => StudioCommand::Models,
            ("help" | "?", _) => StudioCommand::Help,
            ("quit" | "q" | "exit", _) => StudioCommand::Quit,
            (other, _) => {
                return Err(GenAIError::InvalidRequest(format!(
                    "unrecognised command '{}', try 'help'",
                    other
                )))
            }
        };
        Ok(Some(command))
    }
}

/// One-line summary used by the history listing.
pub fn describe_result(index: usize, result: &GenerationResult) -> String {
    let time = result
        .created_at()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| result.timestamp.to_string());
    let marker = if index == 0 { "*" } else { " " };
    format!(
        "{}{:>2}  {}  {}  {}",
        marker,
        index,
        time,
        result.model,
        result.prompt_preview(60)
    )
}
