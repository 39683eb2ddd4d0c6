//! Build phase: extract the source and drive CMake

pub mod cmake;
pub mod extract;

pub use cmake::{BuildDirectory, compile, configure, std_cmake_args};
pub use extract::{ArchiveFormat, extract_source};
