//! Supported languages and project-language detection.
//!
//! One descriptor table drives everything language-related: detection
//! priority, hint resolution, and the listing shown to clients.

mod detector;
mod table;

pub use detector::{detect, extension_counts, summarize, FileSetSummary};
pub use table::{
    lookup, lookup_extension, LanguageDescriptor, ARCHIVE_EXTENSION, DEFAULT_LANGUAGE,
    LANGUAGES, LANGUAGE_TABLE_VERSION,
};
