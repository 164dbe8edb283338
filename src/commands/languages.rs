//! Languages command implementation.

use anyhow::Result;
use serde::Serialize;

use crate::cli::LanguagesArgs;
use crate::language::{LanguageDescriptor, LANGUAGES, LANGUAGE_TABLE_VERSION};

#[derive(Serialize)]
struct Listing {
    version: u32,
    languages: &'static [LanguageDescriptor],
}

/// Run the languages command.
pub fn run(args: LanguagesArgs) -> Result<()> {
    if args.json {
        let listing = Listing {
            version: LANGUAGE_TABLE_VERSION,
            languages: LANGUAGES,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!(
        "  {:<12} {:<12} {:<16} {}",
        "ID", "NAME", "EXTENSIONS", "OUTPUT"
    );
    for lang in LANGUAGES {
        let output = if lang.output_extension.is_empty() {
            "executable"
        } else {
            lang.output_extension
        };
        println!(
            "  {:<12} {:<12} {:<16} {}",
            lang.id,
            lang.display_name,
            lang.extensions.join(","),
            output
        );
    }

    Ok(())
}
