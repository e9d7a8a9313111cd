mod args;
mod commands;

use crate::args::Command;
use args::Args;
use clap::Parser;
use colored::Colorize;
use std::process::exit;

fn main() {
    env_logger::init();

    let args = Args::parse();

    let result = match args.command {
        Command::Render(params) => commands::render(params),
        Command::Chunk(params) => commands::chunk(params),
        Command::Dialects => {
            commands::list_dialects();
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("{intro}: {error}", intro = "error".bold().red());
        exit(1);
    }
}
