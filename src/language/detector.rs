//! Project-language detection from a file set.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::table::{lookup, lookup_extension, LanguageDescriptor, DEFAULT_LANGUAGE, LANGUAGES};
use crate::request::FileEntry;

/// Count lower-cased extensions across a file set.
///
/// Files without an extension are ignored.
pub fn extension_counts(files: &[FileEntry]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for ext in files.iter().filter_map(FileEntry::extension) {
        *counts.entry(ext).or_insert(0) += 1;
    }
    counts
}

/// Infer the project language of a file set.
///
/// Walks the descriptor table in priority order and returns the first
/// language with at least one matching file, or `web` when nothing matches.
pub fn detect(files: &[FileEntry]) -> &'static LanguageDescriptor {
    let counts = extension_counts(files);

    let detected = LANGUAGES.iter().find(|lang| {
        lang.extensions
            .iter()
            .any(|ext| counts.get(*ext).copied().unwrap_or(0) > 0)
    });

    match detected {
        Some(lang) => lang,
        None => lookup(DEFAULT_LANGUAGE).unwrap_or(&LANGUAGES[LANGUAGES.len() - 1]),
    }
}

/// Aggregate view of a file set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSetSummary {
    pub total_files: usize,
    pub total_bytes: u64,
    /// Files per language id; unrecognized extensions count as "text".
    pub languages: BTreeMap<String, usize>,
}

/// Build a [`FileSetSummary`] for a file set.
pub fn summarize(files: &[FileEntry]) -> FileSetSummary {
    let mut summary = FileSetSummary {
        total_files: files.len(),
        ..Default::default()
    };

    for file in files {
        summary.total_bytes += file.content.len() as u64;
        let lang = file
            .extension()
            .and_then(|ext| lookup_extension(&ext))
            .map(|l| l.id)
            .unwrap_or("text");
        *summary.languages.entry(lang.to_string()).or_insert(0) += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<FileEntry> {
        paths.iter().map(|p| FileEntry::new(*p, "")).collect()
    }

    #[test]
    fn test_only_java() {
        assert_eq!(detect(&files(&["Main.java", "util/Helper.java"])).id, "java");
    }

    #[test]
    fn test_java_beats_python() {
        assert_eq!(detect(&files(&["script.py", "Main.java"])).id, "java");
    }

    #[test]
    fn test_java_beats_javascript() {
        assert_eq!(detect(&files(&["app.js", "a.js", "Main.java"])).id, "java");
    }

    #[test]
    fn test_cpp_and_c() {
        assert_eq!(detect(&files(&["main.cpp", "lib.c"])).id, "cpp");
        assert_eq!(detect(&files(&["main.cc"])).id, "cpp");
        assert_eq!(detect(&files(&["main.c", "util.h"])).id, "c");
    }

    #[test]
    fn test_priority_chain() {
        assert_eq!(detect(&files(&["main.go", "lib.rs"])).id, "go");
        assert_eq!(detect(&files(&["main.rs", "Program.cs"])).id, "rust");
        assert_eq!(detect(&files(&["Program.cs", "index.js"])).id, "csharp");
        assert_eq!(detect(&files(&["index.tsx", "index.jsx"])).id, "javascript");
        assert_eq!(detect(&files(&["index.ts", "style.css"])).id, "typescript");
        assert_eq!(detect(&files(&["index.html"])).id, "web");
    }

    #[test]
    fn test_extension_case_is_ignored() {
        assert_eq!(detect(&files(&["MAIN.PY"])).id, "python");
    }

    #[test]
    fn test_default_is_web() {
        assert_eq!(detect(&files(&["README.md", "Makefile"])).id, "web");
        assert_eq!(detect(&[]).id, "web");
    }

    #[test]
    fn test_extension_counts_skip_extensionless() {
        let counts = extension_counts(&files(&["Makefile", "a.c", "b.c", "x.H"]));
        assert_eq!(counts.get("c"), Some(&2));
        assert_eq!(counts.get("h"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_summarize() {
        let set = vec![
            FileEntry::new("main.go", "package main"),
            FileEntry::new("README.md", "# hi"),
            FileEntry::new("go.mod", "module x"),
        ];
        let summary = summarize(&set);

        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.total_bytes, 12 + 4 + 8);
        assert_eq!(summary.languages.get("go"), Some(&1));
        assert_eq!(summary.languages.get("text"), Some(&2));
    }
}
