//! Subcommand implementations.

pub mod compare;
pub mod inspect;
