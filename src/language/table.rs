//! Static language descriptor table.

use serde::Serialize;
use std::env::consts::EXE_SUFFIX;

/// Bumped whenever an entry, an extension, or the ordering changes.
pub const LANGUAGE_TABLE_VERSION: u32 = 1;

/// Extension of archives produced by the packager.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Language reported when no extension matches.
pub const DEFAULT_LANGUAGE: &str = "web";

/// Describes one supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDescriptor {
    /// Identifier used in requests and toolchain dispatch (e.g. "java").
    pub id: &'static str,
    /// Human-readable name (e.g. "Java").
    pub display_name: &'static str,
    /// Lower-case file extensions without the leading dot.
    pub extensions: &'static [&'static str],
    /// Extension of the produced artifact, including the dot when non-empty.
    pub output_extension: &'static str,
}

impl LanguageDescriptor {
    /// Whether `ext` (lower-case, no dot) belongs to this language.
    pub fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.contains(&ext)
    }

    /// Artifact filename for a project of this language.
    pub fn artifact_name(&self, project_name: &str) -> String {
        format!("{}{}", project_name, self.output_extension)
    }
}

/// All supported languages, in detection priority order.
///
/// Compiled languages come first so that a mixed project (say Java sources
/// plus a helper script) is treated as the compiled one.
pub static LANGUAGES: &[LanguageDescriptor] = &[
    LanguageDescriptor {
        id: "java",
        display_name: "Java",
        extensions: &["java"],
        output_extension: ".jar",
    },
    LanguageDescriptor {
        id: "cpp",
        display_name: "C++",
        extensions: &["cpp", "cc"],
        output_extension: EXE_SUFFIX,
    },
    LanguageDescriptor {
        id: "c",
        display_name: "C",
        extensions: &["c"],
        output_extension: EXE_SUFFIX,
    },
    LanguageDescriptor {
        id: "python",
        display_name: "Python",
        extensions: &["py"],
        output_extension: EXE_SUFFIX,
    },
    LanguageDescriptor {
        id: "go",
        display_name: "Go",
        extensions: &["go"],
        output_extension: EXE_SUFFIX,
    },
    LanguageDescriptor {
        id: "rust",
        display_name: "Rust",
        extensions: &["rs"],
        output_extension: EXE_SUFFIX,
    },
    LanguageDescriptor {
        id: "csharp",
        display_name: "C#",
        extensions: &["cs"],
        output_extension: ARCHIVE_EXTENSION,
    },
    LanguageDescriptor {
        id: "javascript",
        display_name: "JavaScript",
        extensions: &["js", "jsx"],
        output_extension: ARCHIVE_EXTENSION,
    },
    LanguageDescriptor {
        id: "typescript",
        display_name: "TypeScript",
        extensions: &["ts", "tsx"],
        output_extension: ARCHIVE_EXTENSION,
    },
    LanguageDescriptor {
        id: "web",
        display_name: "Web Application",
        extensions: &["html", "css"],
        output_extension: ARCHIVE_EXTENSION,
    },
];

/// Find a descriptor by id, ignoring ASCII case.
pub fn lookup(id: &str) -> Option<&'static LanguageDescriptor> {
    let id = id.trim();
    LANGUAGES.iter().find(|l| l.id.eq_ignore_ascii_case(id))
}

/// Find the highest-priority descriptor owning an extension.
pub fn lookup_extension(ext: &str) -> Option<&'static LanguageDescriptor> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    LANGUAGES.iter().find(|l| l.matches_extension(&ext))
}
