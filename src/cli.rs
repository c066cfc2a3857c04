use clap::Parser;
use std::path::PathBuf;

use ytsum::Backend;

#[derive(Parser)]
#[command(
    name = "ytsum",
    about = "YouTube video summarizer web service",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Transcript backend
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Caption language in preference order (repeat for a fallback)
    #[arg(short, long = "lang")]
    pub langs: Vec<String>,

    /// LLM model for summarization (provider is inferred from the name)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Config file (default: ~/.config/ytsum/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}
