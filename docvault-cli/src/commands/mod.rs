//! Subcommand implementations. Each module exposes its clap `Args` and an
//! `execute` entry point.

pub mod delete;
pub mod download;
pub mod info;
pub mod keygen;
pub mod upload;
