//! CLI subcommand implementations for the `glue-crawl` binary.

pub mod compile_cmd;
pub mod doctor;
pub mod run_cmd;
