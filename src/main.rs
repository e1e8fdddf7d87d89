/// The Big IDEA:
/// A project that uses clang-format should never see a commit
/// that undoes its formatting. Reformatting the whole tree is noisy,
/// so only the lines you touched get checked. When they are off,
/// the pre-commit hook shows the fix and lets you apply it, commit
/// anyway, or back out.
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use git_format_gate::core::apply::ApplyFormatOptions;
use git_format_gate::utils;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "git-format-gate")]
#[command(about = "Check and fix the clang-format formatting of the lines you commit")]
#[command(version)]
struct Cli {
    /// Print debug diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FormatterArgs {
    /// The clang-format executable to run
    #[arg(long = "clang-format", env = "CLANG_FORMAT", default_value = "clang-format")]
    program: OsString,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the pre-commit hook in this repository
    Install,
    /// Remove the pre-commit hook installed by `install`
    Uninstall,
    /// Check the staged content; this is what the installed hook runs
    PreCommit {
        #[command(flatten)]
        formatter: FormatterArgs,
        /// Read the answer to the prompt from this file instead of the terminal
        #[arg(long, env = "PRE_COMMIT_HOOK_TTY")]
        input: Option<PathBuf>,
    },
    /// Report staged files that need formatting, without prompting
    Check {
        #[command(flatten)]
        formatter: FormatterArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show (or apply) the formatting fixes for the lines you changed
    ApplyFormat {
        #[command(flatten)]
        formatter: FormatterArgs,
        /// Check the staged content instead of unstaged changes
        #[arg(long, visible_alias = "cached")]
        staged: bool,
        /// Apply the fix instead of printing it
        #[arg(short = 'i', long = "in-place")]
        in_place: bool,
        /// Format the named files entirely and print the result
        #[arg(short = 'f', long = "whole-file")]
        whole_file: bool,
        /// Style passed to clang-format (defaults to hooks.clangFormatDiffStyle, then "file")
        #[arg(long)]
        style: Option<String>,
        /// Compare the working tree against this revision instead of the index
        #[arg(long, conflicts_with = "staged")]
        base: Option<String>,
        /// Only look at these files or directories
        paths: Vec<PathBuf>,
    },
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("GIT_FORMAT_GATE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Install => utils::install_hooks(),
        Commands::Uninstall => utils::uninstall_hooks(),
        Commands::PreCommit { formatter, input } => utils::run_pre_commit(formatter.program, input),
        Commands::Check { formatter, json } => utils::run_check(formatter.program, json),
        Commands::ApplyFormat {
            formatter,
            staged,
            in_place,
            whole_file,
            style,
            base,
            paths,
        } => utils::run_apply_format(
            formatter.program,
            style,
            ApplyFormatOptions {
                staged,
                in_place,
                whole_file,
                base,
                paths,
            },
        ),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_tracing(cli.verbose) {
        eprintln!("{error}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
