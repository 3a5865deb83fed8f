//! BlockCode Configuration Management
//!
//! Loads compiler options from `scriptoptions.txt`.

use blockcode_core::{BlockError, Result};
use blockcode_scripting::builtins::system_module_names;
use blockcode_scripting::CodegenOptions;
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the options file
pub const DEFAULT_CONFIG_PATH: &str = "config/scriptoptions.txt";

/// Compiler configuration
///
/// File format: one `key = value` per line, `#` starts a comment line.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfig {
    /// Folder scanned for `*.bc` scripts (from "sourcefolder" option)
    pub source_folder: PathBuf,
    /// Folder the generated program is written to (from "outputfolder" option)
    pub output_folder: PathBuf,
    /// Indentation unit (from "indent" option: a space count or `tab`)
    pub indent: String,
    /// Name of the loader parameter (from "loaderparam" option)
    pub loader_param: String,
    /// Name of the runner parameter (from "runnerparam" option)
    pub runner_param: String,
    /// Statement emitted on each `forever` iteration (from "yieldstatement" option)
    pub yield_statement: String,
    /// Installed system modules (from "systemmodules" option)
    pub system_modules: Vec<String>,
    /// Keep source comments in the output (from "emitcomments" option)
    pub emit_comments: bool,
    /// Default log filter (from "loglevel" option)
    pub log_level: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        let codegen = CodegenOptions::default();
        Self {
            source_folder: PathBuf::from("scripts"),
            output_folder: PathBuf::from("out"),
            indent: codegen.indent,
            loader_param: codegen.loader_param,
            runner_param: codegen.runner_param,
            yield_statement: codegen.yield_statement,
            system_modules: system_module_names().map(String::from).collect(),
            emit_comments: codegen.emit_comments,
            log_level: "info".to_string(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from an options file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| BlockError::Config(format!("Cannot read {:?}: {}", path, e)))?;
        Ok(Self::parse(&content))
    }

    /// Load configuration from `config/scriptoptions.txt`
    pub fn load_default() -> Result<Self> {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Parse options text. Unknown keys and malformed values are logged
    /// and leave the defaults in place.
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse key=value
            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = line[eq_pos + 1..].trim();

                config.parse_option(&key.to_lowercase(), value);
            } else {
                tracing::warn!("Ignoring malformed config line: {}", line);
            }
        }

        config
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        match key {
            "sourcefolder" => self.source_folder = PathBuf::from(value),
            "outputfolder" => self.output_folder = PathBuf::from(value),
            "indent" => {
                if value.eq_ignore_ascii_case("tab") {
                    self.indent = "\t".to_string();
                } else if let Ok(width) = value.parse::<usize>() {
                    self.indent = " ".repeat(width.min(16));
                } else {
                    tracing::warn!("Invalid indent '{}', keeping default", value);
                }
            }
            "loaderparam" => Self::set_identifier(&mut self.loader_param, key, value),
            "runnerparam" => Self::set_identifier(&mut self.runner_param, key, value),
            "yieldstatement" => {
                if !value.is_empty() {
                    self.yield_statement = value.to_string();
                }
            }
            "systemmodules" => {
                self.system_modules = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "emitcomments" => {
                self.emit_comments = value.parse().unwrap_or(self.emit_comments);
            }
            "loglevel" => self.log_level = value.to_lowercase(),
            _ => {
                tracing::debug!("Unknown config option: {} = {}", key, value);
            }
        }
    }

    fn set_identifier(slot: &mut String, key: &str, value: &str) {
        let valid = value
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

        if valid {
            *slot = value.to_string();
        } else {
            tracing::warn!("Invalid {} '{}', keeping '{}'", key, value, slot);
        }
    }

    /// Options for the code generator
    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            indent: self.indent.clone(),
            loader_param: self.loader_param.clone(),
            runner_param: self.runner_param.clone(),
            yield_statement: self.yield_statement.clone(),
            emit_comments: self.emit_comments,
        }
    }

    /// Display configuration summary
    pub fn display(&self) {
        tracing::info!("Compiler configuration:");
        tracing::info!("  Source folder: {:?}", self.source_folder);
        tracing::info!("  Output folder: {:?}", self.output_folder);
        tracing::info!("  Indent: {:?}", self.indent);
        tracing::info!("  Parameters: ({}, {})", self.loader_param, self.runner_param);
        tracing::info!("  Yield: {}", self.yield_statement);
        tracing::info!("  System modules: {}", self.system_modules.join(", "));
        tracing::info!("  Emit comments: {}", self.emit_comments);
        tracing::info!("  Log level: {}", self.log_level);
    }
}
