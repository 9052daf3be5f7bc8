use clap::Parser;
use log::LevelFilter;
use tokens::cli::Cli;
use tokens::output::Output;
use tokens::runner::{load_templates, read_inputs, run_inputs};
use tokens::{Tokenizer, TokenizerOptions};

const EXIT_UNMATCHED: i32 = 1;
const EXIT_LOAD_ERROR: i32 = 2;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG overrides the -v level
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .init();
}

fn options(cli: &Cli) -> TokenizerOptions {
    let defaults = TokenizerOptions::default();
    TokenizerOptions {
        case_sensitive: !cli.case_insensitive,
        out_of_order_tokens: cli.out_of_order,
        terminate_on_newline: cli.terminate_on_newline,
        throw_on_missing_bind_target: cli.strict,
        ..defaults
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let tokenizer = Tokenizer::new().with_options(options(cli));
    let matcher = load_templates(&cli.templates, &tokenizer)?;
    let inputs = read_inputs(&cli.inputs, cli.strip_ansi)?;

    let results = run_inputs(&matcher, &inputs, &cli.tags, cli.sequential);

    let use_color = !cli.no_color && atty::is(atty::Stream::Stdout);
    let mut output = Output::new(use_color && !cli.json);
    if cli.json {
        output.print_json(&results, cli.all)?;
    } else {
        output.print_results(&results, cli.all)?;
    }

    Ok(results.iter().all(|r| r.matched()))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_UNMATCHED),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(EXIT_LOAD_ERROR);
        }
    }
}
