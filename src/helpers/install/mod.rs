//! Install phase: copy artifacts into the prefix and smoke-test them

pub mod bin;
pub mod smoke;

pub use bin::install;
pub use smoke::smoke_test;
