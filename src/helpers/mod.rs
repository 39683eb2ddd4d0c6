//! Phase helpers
//!
//! Each install phase is a set of plain functions taking explicit inputs
//! and returning explicit outputs:
//!
//! - **acquire**: `fetch_and_verify(url, checksum, cache, name, timeout)`
//! - **build**: `extract_source(archive, dest)`, `configure(...)`, `compile(...)`
//! - **install**: `install(artifact, bin_dir)`, `smoke_test(binary, args, timeout)`

// Internal utility modules (used by other helpers)
pub mod internal;

pub mod acquire;
pub mod build;
pub mod install;
