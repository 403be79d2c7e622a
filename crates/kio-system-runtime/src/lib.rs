/*
 * kio-system-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Storage abstraction layer for package readers.
 *
 * This crate provides a trait-based abstraction over read-only storage,
 * allowing the package reader to run against different backends:
 *
 * - NativeRuntime: the on-disk filesystem (default)
 * - MemoryRuntime: an in-memory file tree for tests and embedding
 */

mod memory;
mod native;
mod traits;

// Re-export core types (API surface)
pub use traits::{PathKind, PathMetadata, RuntimeError, RuntimeResult, SystemRuntime};

// Re-export runtime implementations
pub use memory::MemoryRuntime;
pub use native::NativeRuntime;
