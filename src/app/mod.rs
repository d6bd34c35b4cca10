#[cfg(feature = "cli")]
pub mod commands;
pub mod export;
pub mod import;
pub mod pipelines;
