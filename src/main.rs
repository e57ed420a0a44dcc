use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, ValueHint};
use is_terminal::IsTerminal;

mod backend;
mod config;
mod confirm;
mod cost;
mod credentials;
mod diff;
mod encoding;
mod error;
mod files;
mod input;
mod logging;
mod postprocess;
mod process;
mod prompt;
mod runner;
mod shaper;
mod status;

use config::{ApiLogLevel, Config, DEFAULT_MODEL};
use confirm::TerminalConfirm;
use diff::{DIFF_CONTEXT, DiffStyle};
use input::StdinReader;
use runner::BatchRunner;
use status::StatusHooks;

#[derive(Debug, Parser)]
#[command(
    name = "textshaper",
    version,
    about = "Rewrite text and files with a language model"
)]
struct Cli {
    /// Instruction applied to every input.
    #[arg(short = 'p', long, value_name = "TEXT")]
    prompt: Option<String>,
    /// Read the instruction from a file (`-` for stdin).
    #[arg(short = 'P', long = "prompt-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    prompt_path: Option<String>,
    /// Wrap the instruction with output-shaping guidance.
    #[arg(
        long = "prompt-optimize",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true"
    )]
    prompt_optimize: bool,
    #[arg(short = 'm', long, default_value = DEFAULT_MODEL)]
    model: String,
    /// Completion token limit per request (0 leaves it to the backend).
    #[arg(short = 't', long = "max-tokens", default_value_t = 0)]
    max_tokens: u32,
    /// Requests allowed per input while the output keeps getting cut off.
    #[arg(short = 'c', long = "max-completion-repeat-count", default_value_t = 1)]
    max_completion_repeat_count: usize,
    /// Build prompts but never contact the backend or write files.
    #[arg(short = 'D', long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    verbose: bool,
    #[arg(short = 's', long, action = ArgAction::SetTrue)]
    silent: bool,
    #[arg(short = 'C', long = "show-cost", action = ArgAction::SetTrue)]
    show_cost: bool,
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    diff: bool,
    /// File listing one input per line.
    #[arg(short = 'i', long = "input-file-list", value_name = "PATH", value_hint = ValueHint::FilePath)]
    input_file_list: Option<PathBuf>,
    /// Force the input encoding instead of detecting it.
    #[arg(long = "input-encoding", value_name = "LABEL")]
    input_encoding: Option<String>,
    /// Log backend requests and responses (`info` or `debug`).
    #[arg(long = "log-api-level", value_name = "LEVEL")]
    log_api_level: Option<String>,
    /// Write each result back over its input file.
    #[arg(short = 'r', long, action = ArgAction::SetTrue)]
    rewrite: bool,
    #[arg(short = 'o', long, value_name = "PATH", value_hint = ValueHint::AnyPath)]
    outpath: Option<PathBuf>,
    /// Keep only the first fenced code block of the response.
    #[arg(short = 'f', long = "use-first-code-block", action = ArgAction::SetTrue)]
    use_first_code_block: bool,
    /// Ask before writing each result.
    #[arg(short = 'n', long, action = ArgAction::SetTrue)]
    confirm: bool,
    #[arg(value_name = "FILES", value_hint = ValueHint::AnyPath)]
    files: Vec<String>,
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Config {
            prompt: cli.prompt.clone(),
            prompt_path: cli.prompt_path.clone(),
            prompt_optimize: cli.prompt_optimize,
            model: cli.model.clone(),
            max_tokens: (cli.max_tokens > 0).then_some(cli.max_tokens),
            max_completion_repeat_count: cli.max_completion_repeat_count,
            dry_run: cli.dry_run,
            silent: cli.silent,
            verbose: cli.verbose,
            show_cost: cli.show_cost,
            diff: cli.diff,
            input_file_list: cli.input_file_list.clone(),
            input_encoding: cli.input_encoding.clone(),
            log_api_level: cli
                .log_api_level
                .as_deref()
                .map(ApiLogLevel::parse)
                .unwrap_or_default(),
            rewrite: cli.rewrite,
            outpath: cli.outpath.clone(),
            use_first_code_block: cli.use_first_code_block,
            confirm: cli.confirm,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from(&cli);
    logging::init(config.verbose, config.log_api_level);
    match run(&cli, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns false when the operator declined a stdin result.
fn run(cli: &Cli, config: Config) -> Result<bool> {
    log::debug!("configuration: {config:?}");

    let inputs = input::resolve_inputs(&cli.files, config.input_file_list.as_deref())?;
    log::debug!("{} input(s)", inputs.len());

    let diff_style = DiffStyle {
        context: DIFF_CONTEXT,
        colorize: io::stdout().is_terminal(),
    };
    let mut stdin = StdinReader::process();
    let runner = BatchRunner::new(&config, diff_style)?;
    let prepared = runner.setup(inputs, &mut stdin)?;

    let show_status =
        !config.silent && !input::stdin_has_piped_data() && io::stderr().is_terminal();
    let mut hooks = StatusHooks::new(show_status);
    let mut out = io::stdout().lock();
    let mut confirm = TerminalConfirm::default();

    let report = runner.run(&prepared, &mut hooks, &mut stdin, &mut out, &mut confirm)?;
    out.flush()?;
    Ok(!report.aborted)
}
