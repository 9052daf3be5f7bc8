use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tokens",
    about = "Extract structured data from text with tokens templates",
    version
)]
pub struct Cli {
    /// Template file, or a directory searched recursively for *.tokens files
    pub templates: PathBuf,

    /// Files to extract from; none or "-" reads stdin
    pub inputs: Vec<PathBuf>,

    /// Only run templates carrying this tag (repeatable)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Report every template's result, not only the best
    #[arg(short, long)]
    pub all: bool,

    /// Print one JSON document per input
    #[arg(long)]
    pub json: bool,

    /// Match preambles ignoring case unless a template says otherwise
    #[arg(long)]
    pub case_insensitive: bool,

    /// Allow tokens to match in any order unless a template says otherwise
    #[arg(long)]
    pub out_of_order: bool,

    /// End every capture at the end of its line unless a template says otherwise
    #[arg(long)]
    pub terminate_on_newline: bool,

    /// Fail a template when a value cannot be bound
    #[arg(long)]
    pub strict: bool,

    /// Strip ANSI escape sequences from inputs
    #[arg(long)]
    pub strip_ansi: bool,

    /// Process inputs sequentially instead of in parallel
    #[arg(short, long)]
    pub sequential: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
