use crate::args::{ChunkParams, ChunkingParams, RenderParams};
use colored::Colorize;
use rusty_clause::chunking::chunk_clause_top_level;
use rusty_clause::config::{read_dialect, read_request, Request};
use rusty_clause::dialect::DialectDescriptor;
use rusty_clause::{ClauseBuilder, RequestError};

pub fn render(params: RenderParams) -> Result<(), rusty_clause::Error> {
    let mut request = read_request(&params.request)?;
    apply_chunking(&mut request, &params.chunking);

    if let Some(name) = params.dialect {
        request.dialect = DialectDescriptor::by_name(&name).ok_or(RequestError::UnknownDialect(name))?;
    }

    if let Some(path) = params.dialect_file {
        request.dialect = read_dialect(path)?;
    }

    let quote = params.quote || request.quote_identifiers;
    let builder = ClauseBuilder::new(&request.dialect);

    let statements = match request.chunk_size {
        Some(chunk_size) => builder.select_chunked(
            &request.columns,
            &request.conditions,
            chunk_size,
            request.hard_max_chunk_size,
            quote,
        )?,
        None => vec![builder.select(&request.columns, &request.conditions, quote)?],
    };

    for statement in statements {
        println!("{statement};");
    }

    Ok(())
}

pub fn chunk(params: ChunkParams) -> Result<(), rusty_clause::Error> {
    let mut request = read_request(&params.request)?;
    apply_chunking(&mut request, &params.chunking);

    // Without a chunk size everything stays in one piece.
    let chunk_size = request.chunk_size.unwrap_or(request.conditions.len().max(1));
    let chunks = chunk_clause_top_level(
        &request.conditions,
        chunk_size,
        request.hard_max_chunk_size,
    )?;

    let mut start = 0;
    for (index, chunk) in chunks.enumerate() {
        let end = start + chunk.len();

        println!(
            "{} conditions {}..{}",
            format!("chunk {}", index + 1).bold(),
            start + 1,
            end
        );

        start = end;
    }

    Ok(())
}

pub fn list_dialects() {
    println!("Available dialects:");

    for name in DialectDescriptor::NAMES {
        println!("   {}", name.bold());
    }
}

fn apply_chunking(request: &mut Request, params: &ChunkingParams) {
    if params.chunk_size.is_some() {
        request.chunk_size = params.chunk_size;
    }

    if params.hard_max_chunk_size.is_some() {
        request.hard_max_chunk_size = params.hard_max_chunk_size;
    }
}
