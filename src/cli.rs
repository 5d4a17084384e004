//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_build_report_json, format_build_report_text, format_entries_json,
    format_entries_table, format_extract_report, format_verify_report_json,
    format_verify_report_text,
};
pub use route::RunContext;
