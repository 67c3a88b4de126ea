// Library root: re-exports all modules so integration tests and the binary
// share the same public API.

pub mod analysis;
pub mod config;
pub mod metadata;
pub mod record;
pub mod scoring;
pub mod table;
