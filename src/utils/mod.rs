use crate::builders::formatter::ClangFormat;
use crate::builders::hooks;
use crate::core::apply::{ApplyFormat, ApplyFormatOptions};
use crate::core::config::{ConfigManager, ConfigProvider};
use crate::core::engine::{CheckReport, FormatGate, GateOutcome, InputSource};
use crate::core::error::GateError;
use crate::core::git::{Git2Client, GitClient};
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

pub fn install_hooks() -> Result<()> {
    let git = open_repository()?;
    let hooks_dir = git.get_hooks_dir()?;
    let binary = std::env::current_exe().context("Failed to locate the git-format-gate binary")?;
    hooks::install_pre_commit_hook(&hooks_dir, &binary)?;
    println!("Pre-commit hook installed.");
    Ok(())
}

pub fn uninstall_hooks() -> Result<()> {
    let git = open_repository()?;
    let hook_path = hooks::uninstall_pre_commit_hook(&git.get_hooks_dir()?)?;
    println!("Pre-commit hook removed from {}.", hook_path.display());
    Ok(())
}

/// Runs the gate as git's pre-commit hook.
pub fn run_pre_commit(clang_format: OsString, input: Option<PathBuf>) -> Result<()> {
    let git = open_repository()?;
    let config = get_config_manager(&git)?.load_config()?;
    let formatter = ClangFormat::new(clang_format, git.get_repo_root());
    let input = input.map_or(InputSource::Terminal, InputSource::File);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = FormatGate::new(&git, &formatter, &config).run(input, &mut out)?;
    match outcome {
        GateOutcome::Clean => tracing::debug!("staged content is formatted"),
        GateOutcome::Applied(files) => tracing::info!(count = files.len(), "formatting applied"),
        GateOutcome::Forced(files) => tracing::info!(count = files.len(), "committing unformatted files"),
    }
    Ok(())
}

/// Reports the gate's verdicts without prompting.
pub fn run_check(clang_format: OsString, json: bool) -> Result<()> {
    let git = open_repository()?;
    let config = get_config_manager(&git)?.load_config()?;
    let formatter = ClangFormat::new(clang_format, git.get_repo_root());
    let verdicts = FormatGate::new(&git, &formatter, &config).check()?;
    let report = CheckReport::from(verdicts.as_slice());

    if json {
        let rendered = serde_json::to_string_pretty(&report).context("Failed to serialize the report")?;
        println!("{rendered}");
    } else {
        for entry in report.files.iter().filter(|entry| entry.verdict != "clean") {
            println!("{}", entry.path.display());
        }
    }

    if report.clean {
        Ok(())
    } else {
        let files = report
            .files
            .into_iter()
            .filter(|entry| entry.verdict != "clean")
            .map(|entry| entry.path)
            .collect();
        Err(GateError::NeedsFormatting(files).into())
    }
}

pub fn run_apply_format(
    clang_format: OsString,
    style: Option<String>,
    mut options: ApplyFormatOptions,
) -> Result<()> {
    let git = open_repository()?;
    let style = match style {
        Some(style) => style,
        None => get_config_manager(&git)?.load_config()?.style,
    };
    options.paths = options
        .paths
        .iter()
        .map(|path| git.relative_to_root(path))
        .collect::<Result<_, _>>()?;

    let formatter = ClangFormat::new(clang_format, git.get_repo_root());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    ApplyFormat::new(&git, &formatter, style).run(&options, &mut out)?;
    out.flush()?;
    Ok(())
}

fn open_repository() -> Result<Git2Client> {
    Git2Client::from_env().context("Not in a Git repository")
}

// Helper function to create ConfigManager instance
fn get_config_manager(git: &Git2Client) -> Result<ConfigManager> {
    ConfigManager::new(git.repository()).context("Failed to read git configuration")
}
