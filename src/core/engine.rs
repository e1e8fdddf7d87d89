use crate::builders::formatter::Formatter;
use crate::builders::patterns::is_formattable;
use crate::builders::reporter::{ConsoleReporter, RETRY_PROMPT};
use crate::core::apply::{FileFix, WorkingTreeSync, fix_changed_lines, sync_working_tree};
use crate::core::config::GateConfig;
use crate::core::error::{GateError, GateResult};
use crate::core::git::GitClient;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

/// How many answers are read before giving up on getting a decision.
const MAX_DECISION_ATTEMPTS: usize = 2;

/// The outcome of checking one staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatVerdict {
    Clean,
    NeedsFix(FileFix),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVerdict {
    pub path: PathBuf,
    pub verdict: FormatVerdict,
}

impl FileVerdict {
    pub fn fix(&self) -> Option<&FileFix> {
        match &self.verdict {
            FormatVerdict::Clean => None,
            FormatVerdict::NeedsFix(fix) => Some(fix),
        }
    }
}

/// The operator's answer to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Apply,
    Force,
    Cancel,
}

impl GateDecision {
    /// Parses a single-character answer; surrounding whitespace and case are ignored.
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "a" => Some(Self::Apply),
            "f" => Some(Self::Force),
            "c" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// How a commit attempt that was let through ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Nothing needed formatting.
    Clean,
    /// The listed files were fixed in the index.
    Applied(Vec<PathBuf>),
    /// The listed files are committed unformatted.
    Forced(Vec<PathBuf>),
}

/// Where the operator's answer comes from. It is only opened when a prompt is needed.
pub enum InputSource {
    /// The controlling terminal; git hooks have no usable stdin.
    Terminal,
    File(PathBuf),
    Reader(Box<dyn BufRead>),
}

impl InputSource {
    fn open(self) -> io::Result<Box<dyn BufRead>> {
        match self {
            Self::Terminal => {
                let tty = if cfg!(windows) { "CONIN$" } else { "/dev/tty" };
                Ok(Box::new(BufReader::new(File::open(tty)?)))
            }
            Self::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            Self::Reader(reader) => Ok(reader),
        }
    }
}

/// Machine-readable summary produced by `check --json`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub clean: bool,
    pub files: Vec<CheckEntry>,
}

#[derive(Debug, Serialize)]
pub struct CheckEntry {
    pub path: PathBuf,
    pub verdict: &'static str,
}

impl From<&[FileVerdict]> for CheckReport {
    fn from(verdicts: &[FileVerdict]) -> Self {
        let files: Vec<CheckEntry> = verdicts
            .iter()
            .map(|verdict| CheckEntry {
                path: verdict.path.clone(),
                verdict: match verdict.verdict {
                    FormatVerdict::Clean => "clean",
                    FormatVerdict::NeedsFix(_) => "needs-fix",
                },
            })
            .collect();
        Self {
            clean: files.iter().all(|entry| entry.verdict == "clean"),
            files,
        }
    }
}

/// The pre-commit format gate.
///
/// Checks the staged content against the formatter and, when something is
/// off, either rejects the commit or asks the operator once whether to apply
/// the fix, force the commit or cancel it.
pub struct FormatGate<'a> {
    git: &'a dyn GitClient,
    formatter: &'a dyn Formatter,
    config: &'a GateConfig,
}

impl<'a> FormatGate<'a> {
    pub fn new(git: &'a dyn GitClient, formatter: &'a dyn Formatter, config: &'a GateConfig) -> Self {
        Self {
            git,
            formatter,
            config,
        }
    }

    /// Computes a verdict for every staged file that is neither ignored nor
    /// outside the formatter's languages. A style configuration error aborts
    /// the whole check.
    pub fn check(&self) -> GateResult<Vec<FileVerdict>> {
        let mut verdicts = Vec::new();
        for path in self.git.get_staged_files()? {
            if let Some(pattern) = self.config.ignore_list.matching_pattern(&path) {
                tracing::debug!(path = %path.display(), %pattern, "ignored");
                continue;
            }
            if !is_formattable(&path) {
                tracing::debug!(path = %path.display(), "not a formattable source file");
                continue;
            }

            let staged = self.git.read_staged_file_content(&path)?;
            let head = self
                .git
                .read_revision_file_content("HEAD", &path)?
                .unwrap_or_default();
            let (Ok(staged), Ok(head)) = (String::from_utf8(staged), String::from_utf8(head)) else {
                tracing::warn!(path = %path.display(), "skipping file that is not UTF-8");
                continue;
            };

            let verdict = match fix_changed_lines(
                self.formatter,
                &self.config.style,
                &path,
                &head,
                &staged,
            )? {
                Some(fix) => FormatVerdict::NeedsFix(fix),
                None => FormatVerdict::Clean,
            };
            verdicts.push(FileVerdict { path, verdict });
        }
        Ok(verdicts)
    }

    /// Runs the gate for one commit attempt. `Ok` lets the commit proceed;
    /// any error must stop it.
    pub fn run(&self, input: InputSource, out: &mut dyn Write) -> GateResult<GateOutcome> {
        let verdicts = self.check()?;
        let fixes: Vec<&FileFix> = verdicts.iter().filter_map(FileVerdict::fix).collect();
        if fixes.is_empty() {
            return Ok(GateOutcome::Clean);
        }
        let files: Vec<PathBuf> = fixes.iter().map(|fix| fix.path.clone()).collect();

        let mut reporter = ConsoleReporter::new(out);
        reporter.patches(fixes.iter().map(|fix| &fix.patch))?;
        reporter.needs_formatting(&files)?;

        if !self.config.interactive {
            reporter.non_interactive()?;
            return Err(GateError::NeedsFormatting(files));
        }

        reporter.choices()?;
        let mut input = input.open()?;
        let decision = read_decision(input.as_mut(), &mut reporter)?;
        tracing::info!(?decision, files = files.len(), "operator decision");

        match decision {
            GateDecision::Apply => {
                self.apply(&fixes, &mut reporter)?;
                Ok(GateOutcome::Applied(files))
            }
            GateDecision::Force => {
                reporter.forced()?;
                // Any line, or none at all, continues.
                let mut line = String::new();
                input.read_line(&mut line)?;
                Ok(GateOutcome::Forced(files))
            }
            GateDecision::Cancel => Err(GateError::Cancelled),
        }
    }

    /// Rewrites the staged content of every file, all or nothing, then brings
    /// the working tree copies along.
    fn apply(&self, fixes: &[&FileFix], reporter: &mut ConsoleReporter<'_>) -> GateResult<()> {
        for (done, fix) in fixes.iter().enumerate() {
            if let Err(err) = self
                .git
                .write_staged_file_content(&fix.path, fix.formatted.as_bytes())
            {
                self.rollback(&fixes[..done]);
                return Err(err);
            }
        }

        // Every fix is in the index now; a working tree failure is reported, not fatal.
        for fix in fixes {
            reporter.patching(&fix.path)?;
            match sync_working_tree(self.git, fix) {
                Ok(WorkingTreeSync::Updated | WorkingTreeSync::Missing) => {}
                Ok(WorkingTreeSync::Conflict) => reporter.working_tree_conflict(&fix.path)?,
                Err(err) => {
                    tracing::warn!(path = %fix.path.display(), %err, "could not update the working tree copy");
                    reporter.working_tree_conflict(&fix.path)?;
                }
            }
        }
        Ok(())
    }

    fn rollback(&self, written: &[&FileFix]) {
        for fix in written.iter().rev() {
            if let Err(err) = self
                .git
                .write_staged_file_content(&fix.path, fix.original.as_bytes())
            {
                tracing::error!(path = %fix.path.display(), %err, "could not restore staged content");
            }
        }
    }
}

/// Reads answers until one is valid, allowing a single retry.
fn read_decision(input: &mut dyn BufRead, reporter: &mut ConsoleReporter<'_>) -> GateResult<GateDecision> {
    for attempt in 1..=MAX_DECISION_ATTEMPTS {
        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            reporter.end_prompt()?;
            return Err(GateError::NoDecision);
        }
        if let Some(decision) = GateDecision::parse(&answer) {
            return Ok(decision);
        }
        reporter.invalid_choice(&answer)?;
        if attempt < MAX_DECISION_ATTEMPTS {
            reporter.prompt(RETRY_PROMPT)?;
        }
    }
    Err(GateError::NoDecision)
}

