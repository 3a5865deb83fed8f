//! Command-line interface for BlockCode.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// BlockCode - compile block scripts to JavaScript
#[derive(Parser, Debug)]
#[command(name = "blockcode")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Options file (defaults to config/scriptoptions.txt)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// What to print
    #[arg(short, long, value_enum, default_value_t = Emit::Js)]
    pub emit: Emit,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Script files; the configured source folder is compiled when empty
    pub files: Vec<PathBuf>,
}

/// Output stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    /// Token stream as JSON
    Tokens,
    /// Validated syntax trees as JSON
    Ast,
    /// Generated program
    Js,
}
