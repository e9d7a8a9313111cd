use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Renders the SELECT statements described by a request file.
    ///
    /// If the request (or the command line) sets a chunk size, conditions are split at top-level
    /// ORs and one statement is printed per chunk.
    Render(RenderParams),
    /// Shows where the conditions of a request file would be split, without rendering them.
    Chunk(ChunkParams),
    /// Lists the built-in dialects.
    Dialects,
}

#[derive(clap::Args, Debug)]
pub struct RenderParams {
    /// JSON request file
    pub request: PathBuf,
    /// Built-in dialect to use instead of the one named in the request
    #[arg(short, long, conflicts_with = "dialect_file")]
    pub dialect: Option<String>,
    /// JSON file describing a custom dialect
    #[arg(long)]
    pub dialect_file: Option<PathBuf>,
    #[command(flatten)]
    pub chunking: ChunkingParams,
    /// Quote every identifier
    #[arg(short, long)]
    pub quote: bool,
}

#[derive(clap::Args, Debug)]
pub struct ChunkParams {
    /// JSON request file
    pub request: PathBuf,
    #[command(flatten)]
    pub chunking: ChunkingParams,
}

#[derive(clap::Args, Debug)]
pub struct ChunkingParams {
    /// Smallest number of conditions per statement before looking for a place to split
    #[arg(short = 's', long)]
    pub chunk_size: Option<usize>,
    /// Split at this many conditions even if it is not a safe place to do so
    #[arg(long = "hard-max")]
    pub hard_max_chunk_size: Option<usize>,
}
