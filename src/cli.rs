//! CLI argument parsing for a single execution pass.
//!
//! There are no subcommands: every invocation reaps, triggers, and triages
//! the matching workspaces once, then exits.
use clap::Parser;
use std::path::PathBuf;

/// Workspace name pattern used when none is given on the command line.
pub const DEFAULT_NAME_REGEX: &str = "example-workspace";

/// Organization scanned when none is given on the command line.
pub const DEFAULT_ORGANIZATION: &str = "example_org";

/// Review log written in the working directory by default.
pub const DEFAULT_REVIEW_LOG: &str = "review_links.csv";

#[derive(Parser, Debug)]
#[command(
    name = "wsrun",
    version,
    about = "Discard stale runs, trigger fresh plans, and triage the results",
    after_help = "Environment:\n  API_TOKEN        Bearer token for the platform API (required)\n  WSRUN_API_BASE   API base URL override\n  WSRUN_UI_BASE    UI base URL override used for review links\n  RUST_LOG         Log filter (overrides --verbose)\n\nExamples:\n  wsrun --name_regex '^network-'\n  wsrun --apply --tag nightly"
)]
pub struct RunArgs {
    /// Auto-apply runs whose plan only adds resources
    #[arg(long)]
    pub apply: bool,

    /// Regex to filter workspace names (matches anywhere in the name)
    #[arg(
        long = "name_regex",
        visible_alias = "name-regex",
        value_name = "REGEX",
        default_value = DEFAULT_NAME_REGEX
    )]
    pub name_regex: Option<String>,

    /// Only include workspaces carrying this tag
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Organization whose workspaces are scanned
    #[arg(long, value_name = "ORG", default_value = DEFAULT_ORGANIZATION)]
    pub organization: String,

    /// Output path for the manual-review CSV (truncated on every run)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_REVIEW_LOG)]
    pub review_log: PathBuf,

    /// Emit debug-level logs
    #[arg(long)]
    pub verbose: bool,
}
