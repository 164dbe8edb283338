//! Built-in toolchains.

mod cargo;
mod go;
mod java;
mod native;
mod python;
mod web;

pub use cargo::CargoToolchain;
pub use go::GoToolchain;
pub use java::JavaToolchain;
pub use native::NativeToolchain;
pub use python::PythonToolchain;
pub use web::ArchiveToolchain;

use crate::toolchain::Toolchain;

/// Returns the built-in toolchains that run a compiler.
///
/// [`ArchiveToolchain`] is not listed; the registry keeps it as fallback.
pub fn compiling_toolchains() -> Vec<Box<dyn Toolchain>> {
    vec![
        Box::new(JavaToolchain),
        Box::new(NativeToolchain),
        Box::new(PythonToolchain::new()),
        Box::new(GoToolchain),
        Box::new(CargoToolchain),
    ]
}
