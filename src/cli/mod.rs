//! Command line interface

pub mod args;
pub mod output;

pub use args::{Args, Command, CommonArgs, VerbosityLevel};
pub use output::OutputFormatter;
