// Input handling for the mom-policy binary
// Reads a policy from a file, a command-line string or a stdin pipe

use clap::ValueEnum;
use std::fs;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use thiserror::Error;

/// Where the policy text comes from
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Interactive REPL (requires the `repl` feature)
    Interactive,
    /// Evaluate a string given on the command line
    String,
    /// Evaluate a policy file
    File,
    /// Read the policy from stdin
    Pipe,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputConfig {
    pub source: InputSource,
    pub file_path: Option<PathBuf>,
    pub string_content: Option<String>,
    pub verbose: bool,
}

impl InputConfig {
    pub fn from_file(file_path: PathBuf, verbose: bool) -> Self {
        Self {
            source: InputSource::File,
            file_path: Some(file_path),
            string_content: None,
            verbose,
        }
    }

    pub fn from_string(content: String, verbose: bool) -> Self {
        Self {
            source: InputSource::String,
            file_path: None,
            string_content: Some(content),
            verbose,
        }
    }

    pub fn from_pipe(verbose: bool) -> Self {
        Self {
            source: InputSource::Pipe,
            file_path: None,
            string_content: None,
            verbose,
        }
    }

    /// Builds a config from command-line arguments.
    pub fn from_args(
        source: InputSource,
        file_path: Option<PathBuf>,
        string_content: Option<String>,
        verbose: bool,
    ) -> Result<Self, InputError> {
        validate_input_args(source, &file_path, &string_content)?;
        match (source, file_path, string_content) {
            (InputSource::File, Some(path), _) => Ok(Self::from_file(path, verbose)),
            (InputSource::String, _, Some(content)) => Ok(Self::from_string(content, verbose)),
            (InputSource::Pipe, _, _) => Ok(Self::from_pipe(verbose)),
            (InputSource::Interactive, _, _) => Err(InputError::InteractiveNotSupported),
            (InputSource::File, None, _) => Err(InputError::MissingFileArgument),
            (InputSource::String, _, None) => Err(InputError::MissingStringArgument),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputContent {
    pub content: String,
    pub source_name: String,
}

pub fn read_input_content(config: &InputConfig) -> Result<InputContent, InputError> {
    match config.source {
        InputSource::File => {
            let file_path = config
                .file_path
                .as_ref()
                .ok_or(InputError::MissingFileArgument)?;
            if config.verbose {
                eprintln!("reading policy from {}", file_path.display());
            }
            let content = fs::read_to_string(file_path).map_err(|e| InputError::FileRead {
                path: file_path.clone(),
                source: e,
            })?;
            Ok(InputContent {
                content,
                source_name: file_path.to_string_lossy().to_string(),
            })
        }
        InputSource::String => {
            let content = config
                .string_content
                .clone()
                .ok_or(InputError::MissingStringArgument)?;
            Ok(InputContent {
                content,
                source_name: "<string>".to_string(),
            })
        }
        InputSource::Pipe => {
            if config.verbose {
                eprintln!("reading policy from stdin");
            }
            let content = read_lines(io::stdin().lock())?;
            Ok(InputContent {
                content,
                source_name: "<stdin>".to_string(),
            })
        }
        InputSource::Interactive => Err(InputError::InteractiveNotSupported),
    }
}

/// Reads every line of `reader`, normalizing line endings to `\n`.
pub fn read_lines<R: BufRead>(reader: R) -> Result<String, InputError> {
    let mut content = String::new();
    for line in reader.lines() {
        content.push_str(&line.map_err(InputError::StdinRead)?);
        content.push('\n');
    }
    Ok(content)
}

pub fn validate_input_args(
    source: InputSource,
    file_path: &Option<PathBuf>,
    string_content: &Option<String>,
) -> Result<(), InputError> {
    match source {
        InputSource::File if file_path.is_none() => Err(InputError::MissingFileArgument),
        InputSource::String if string_content.is_none() => Err(InputError::MissingStringArgument),
        _ => Ok(()),
    }
}

/// Picks an input source when none was given explicitly: a file or string
/// argument wins, then a non-terminal stdin, then the REPL.
pub fn detect_input_source(
    file_path: &Option<PathBuf>,
    string_content: &Option<String>,
) -> Result<InputSource, InputError> {
    let stdin_is_pipe = !io::stdin().is_terminal();
    match (file_path.is_some(), string_content.is_some()) {
        (true, true) => Err(InputError::MultipleInputSources),
        (true, false) => Ok(InputSource::File),
        (false, true) => Ok(InputSource::String),
        (false, false) if stdin_is_pipe => Ok(InputSource::Pipe),
        (false, false) => Ok(InputSource::Interactive),
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("--file argument required when using --input file")]
    MissingFileArgument,

    #[error("--string argument required when using --input string")]
    MissingStringArgument,

    #[error("error reading file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error reading from stdin: {0}")]
    StdinRead(#[source] io::Error),

    #[error("interactive mode is not available in this build")]
    InteractiveNotSupported,

    #[error("multiple input sources given; use only one of --file or --string")]
    MultipleInputSources,
}
