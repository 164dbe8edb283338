//! Toolchain registry for language dispatch.

use crate::toolchain::adapters::{compiling_toolchains, ArchiveToolchain};
use crate::toolchain::Toolchain;

/// Registry that maps language ids onto toolchains.
///
/// Languages no compiling toolchain claims are archived like web projects.
pub struct ToolchainRegistry {
    toolchains: Vec<Box<dyn Toolchain>>,
    fallback: ArchiveToolchain,
}

impl ToolchainRegistry {
    /// Create a registry with all built-in toolchains.
    pub fn new() -> Self {
        Self {
            toolchains: compiling_toolchains(),
            fallback: ArchiveToolchain::new(),
        }
    }

    fn all(&self) -> impl Iterator<Item = &dyn Toolchain> {
        self.toolchains
            .iter()
            .map(|t| t.as_ref())
            .chain(std::iter::once(&self.fallback as &dyn Toolchain))
    }

    /// Get a toolchain by its own id.
    pub fn get(&self, id: &str) -> Option<&dyn Toolchain> {
        self.all().find(|t| t.id() == id)
    }

    /// The toolchain building `language`.
    pub fn for_language(&self, language: &str) -> &dyn Toolchain {
        self.all()
            .find(|t| t.handles(language))
            .unwrap_or(&self.fallback)
    }

    /// List all toolchain ids.
    pub fn ids(&self) -> Vec<&str> {
        self.all().map(|t| t.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.toolchains.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for ToolchainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LANGUAGES;

    #[test]
    fn test_registry_has_all_toolchains() {
        let registry = ToolchainRegistry::new();
        assert_eq!(
            registry.ids(),
            ["java", "native", "python", "go", "cargo", "archive"]
        );
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_every_language_is_dispatchable() {
        let registry = ToolchainRegistry::new();
        for lang in LANGUAGES {
            assert!(
                registry.all().any(|t| t.handles(lang.id)),
                "{} has no toolchain",
                lang.id
            );
        }
    }

    #[test]
    fn test_for_language() {
        let registry = ToolchainRegistry::new();
        assert_eq!(registry.for_language("c").id(), "native");
        assert_eq!(registry.for_language("cpp").id(), "native");
        assert_eq!(registry.for_language("rust").id(), "cargo");
        assert_eq!(registry.for_language("csharp").id(), "archive");
        assert_eq!(registry.for_language("cobol").id(), "archive");
    }

    #[test]
    fn test_get_by_id() {
        let registry = ToolchainRegistry::new();
        assert_eq!(registry.get("go").unwrap().display_name(), "Go");
        assert!(registry.get("rust").is_none());
    }
}
