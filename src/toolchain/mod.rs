//! Per-language build toolchains.
//!
//! This module provides:
//! - The [`Toolchain`] trait each language implements
//! - The [`ToolRunner`] capability used for every external process
//! - A registry dispatching language ids to toolchains

mod adapter;
pub mod adapters;
mod registry;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{find_sources, read_artifact, Artifact, BuildContext, Toolchain};
pub use registry::ToolchainRegistry;
pub use runner::{Invocation, ProcessRunner, ToolOutput, ToolRunner};
