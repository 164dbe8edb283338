//! Detect command implementation.

use anyhow::Result;
use humansize::{format_size, BINARY};
use serde::Serialize;

use crate::cli::DetectArgs;
use crate::commands::load_request;
use crate::language::{detect, lookup, summarize, FileSetSummary};

#[derive(Serialize)]
struct Detection {
    language: &'static str,
    summary: FileSetSummary,
}

/// Run the detect command.
pub fn run(args: DetectArgs) -> Result<()> {
    let request = load_request(&args.input)?;

    let language = request
        .language
        .as_deref()
        .and_then(lookup)
        .unwrap_or_else(|| detect(&request.files));
    let summary = summarize(&request.files);

    if args.json {
        let detection = Detection {
            language: language.id,
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&detection)?);
        return Ok(());
    }

    println!("Language: {} ({})", language.display_name, language.id);
    println!(
        "Files:    {} ({})",
        summary.total_files,
        format_size(summary.total_bytes, BINARY)
    );
    for (lang, count) in &summary.languages {
        println!("  {:<12} {}", lang, count);
    }

    Ok(())
}
