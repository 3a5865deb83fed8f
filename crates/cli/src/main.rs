//! BlockCode - block script compiler
//!
//! Reads scripts, validates them against the installed system modules
//! and writes the generated program.

mod cli;

use anyhow::{Context, Result};
use blockcode_config::CompilerConfig;
use blockcode_scripting::dsl::lexer;
use blockcode_scripting::loader::script_paths;
use blockcode_scripting::{CodeLoader, ModuleLoader};
use clap::Parser;
use cli::{Cli, Emit};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Options decide the log level, so load them before tracing is up
    let loaded = match &cli.config {
        Some(path) => CompilerConfig::load_from_file(path),
        None => CompilerConfig::load_default(),
    };
    let (config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (CompilerConfig::default(), Some(e)),
    };

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match load_error {
        None => info!("Configuration loaded"),
        Some(e) => {
            warn!("Failed to load options: {}", e);
            warn!("Using default configuration");
        }
    }
    config.display();

    let files = script_files(&cli, &config)?;
    let output = match cli.emit {
        Emit::Tokens => emit_tokens(&files)?,
        Emit::Ast => emit_ast(&config, &files)?,
        Emit::Js => compile(&config, &files)?,
    };

    let out = cli.out.clone().or_else(|| {
        // A whole-folder build goes to the output folder by default
        (cli.files.is_empty() && cli.emit == Emit::Js).then(|| config.output_folder.join("program.js"))
    });
    match out {
        Some(path) => write_output(&path, &output)?,
        None => print!("{}", output),
    }
    Ok(())
}

/// Files named on the command line, or every script in the source folder
fn script_files(cli: &Cli, config: &CompilerConfig) -> Result<Vec<PathBuf>> {
    if !cli.files.is_empty() {
        return Ok(cli.files.clone());
    }

    let folder = &config.source_folder;
    let files = script_paths(folder).with_context(|| format!("Cannot read source folder {:?}", folder))?;

    debug!("Found {} script(s) in {:?}", files.len(), folder);
    Ok(files)
}

fn emit_tokens(files: &[PathBuf]) -> Result<String> {
    let mut streams = Vec::with_capacity(files.len());
    for path in files {
        let source = fs::read_to_string(path).with_context(|| format!("Cannot read {:?}", path))?;
        let tokens = lexer::load(&source).with_context(|| format!("Failed to lex {:?}", path))?;
        streams.push(tokens);
    }
    Ok(serde_json::to_string_pretty(&streams)? + "\n")
}

fn load_modules(config: &CompilerConfig, files: &[PathBuf]) -> Result<ModuleLoader> {
    let mut loader = ModuleLoader::with_selected(&config.system_modules);
    for path in files {
        loader
            .load_file(path)
            .with_context(|| format!("Failed to compile {:?}", path))?;
    }
    info!("Compiled {} module(s)", files.len());
    Ok(loader)
}

fn emit_ast(config: &CompilerConfig, files: &[PathBuf]) -> Result<String> {
    let loader = load_modules(config, files)?;
    let modules: Vec<_> = loader.user_modules().collect();
    Ok(serde_json::to_string_pretty(&modules)? + "\n")
}

fn compile(config: &CompilerConfig, files: &[PathBuf]) -> Result<String> {
    let loader = load_modules(config, files)?;
    let program = loader
        .generate(&config.codegen_options())
        .context("Code generation failed")?;
    Ok(program)
}

fn write_output(path: &Path, output: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Cannot create {:?}", parent))?;
    }
    fs::write(path, output).with_context(|| format!("Cannot write {:?}", path))?;
    info!("Wrote {} bytes to {:?}", output.len(), path);
    Ok(())
}
