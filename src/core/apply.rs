use crate::builders::formatter::{FormatRequest, Formatter};
use crate::builders::patch::{FormatPatch, LineSelection, changed_lines};
use crate::builders::patterns::is_formattable;
use crate::core::error::{GateError, GateResult};
use crate::core::git::GitClient;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A file whose content differs from its formatted version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFix {
    pub path: PathBuf,
    pub original: String,
    pub formatted: String,
    pub patch: FormatPatch,
}

/// Formats the lines of `target` that changed relative to `base`.
///
/// Returns `None` when those lines are already formatted (or nothing changed).
pub fn fix_changed_lines(
    formatter: &dyn Formatter,
    style: &str,
    path: &Path,
    base: &str,
    target: &str,
) -> GateResult<Option<FileFix>> {
    let selection = LineSelection::Ranges(changed_lines(base, target)?);
    fix_selection(formatter, style, path, target, &selection)
}

/// Formats `lines` of `content`, returning the fix if anything changed.
pub fn fix_selection(
    formatter: &dyn Formatter,
    style: &str,
    path: &Path,
    content: &str,
    lines: &LineSelection,
) -> GateResult<Option<FileFix>> {
    if lines.is_empty() {
        return Ok(None);
    }
    let formatted = formatter.format(&FormatRequest {
        path,
        content,
        style,
        lines,
    })?;
    if formatted == content {
        return Ok(None);
    }
    let patch = FormatPatch::between(path, content, &formatted)?;
    if patch.is_empty() {
        return Ok(None);
    }
    Ok(Some(FileFix {
        path: path.to_path_buf(),
        original: content.to_string(),
        formatted,
        patch,
    }))
}

/// What happened to the working tree copy after a staged fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingTreeSync {
    /// The working file now carries the fix.
    Updated,
    /// There is no working file to update.
    Missing,
    /// The working file has diverged too far for the patch to apply.
    Conflict,
}

/// Carries a staged fix over to the working tree copy of the file, keeping
/// any unstaged edits it holds.
pub fn sync_working_tree(git: &dyn GitClient, fix: &FileFix) -> GateResult<WorkingTreeSync> {
    let Some(working) = git.read_working_file(&fix.path)? else {
        return Ok(WorkingTreeSync::Missing);
    };
    if working == fix.original.as_bytes() {
        git.write_working_file(&fix.path, fix.formatted.as_bytes())?;
        return Ok(WorkingTreeSync::Updated);
    }

    let patched = String::from_utf8(working)
        .ok()
        .and_then(|text| fix.patch.apply_to(&text));
    match patched {
        Some(text) => {
            git.write_working_file(&fix.path, text.as_bytes())?;
            Ok(WorkingTreeSync::Updated)
        }
        None => {
            tracing::warn!(path = %fix.path.display(), "fix does not apply to the working tree copy");
            Ok(WorkingTreeSync::Conflict)
        }
    }
}

/// Options of the `apply-format` helper.
#[derive(Debug, Clone, Default)]
pub struct ApplyFormatOptions {
    /// Check what is staged (`HEAD` to index) instead of unstaged edits.
    pub staged: bool,
    /// Fix the content instead of printing a patch.
    pub in_place: bool,
    /// Format each named file entirely instead of only the changed lines.
    pub whole_file: bool,
    /// Compare the working tree to this revision instead of the index.
    pub base: Option<String>,
    /// Restrict processing to these files or directories, relative to the work tree.
    pub paths: Vec<PathBuf>,
}

/// The formatting helper: reports, or fixes, formatting problems in changed lines.
pub struct ApplyFormat<'a> {
    git: &'a dyn GitClient,
    formatter: &'a dyn Formatter,
    style: String,
}

impl<'a> ApplyFormat<'a> {
    pub fn new(git: &'a dyn GitClient, formatter: &'a dyn Formatter, style: impl Into<String>) -> Self {
        Self {
            git,
            formatter,
            style: style.into(),
        }
    }

    pub fn run(&self, options: &ApplyFormatOptions, out: &mut dyn Write) -> GateResult<()> {
        if options.whole_file {
            return self.run_whole_file(options, out);
        }

        let fixes = self.collect_fixes(options)?;
        if !options.in_place {
            for fix in &fixes {
                write!(out, "{}", fix.patch.render())?;
            }
            return Ok(());
        }

        for fix in &fixes {
            if options.staged {
                self.git
                    .write_staged_file_content(&fix.path, fix.formatted.as_bytes())?;
                if sync_working_tree(self.git, fix)? == WorkingTreeSync::Conflict {
                    tracing::warn!(path = %fix.path.display(), "only the staged content was fixed");
                }
            } else {
                self.git
                    .write_working_file(&fix.path, fix.formatted.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Computes the fixes for the selected changes without applying them.
    pub fn collect_fixes(&self, options: &ApplyFormatOptions) -> GateResult<Vec<FileFix>> {
        let files = if options.staged {
            self.git.get_staged_files()?
        } else if let Some(base) = &options.base {
            self.git.get_changed_files_since(base)?
        } else {
            self.git.get_unstaged_files()?
        };

        let mut fixes = Vec::new();
        for path in files {
            if !is_formattable(&path) || !selected(&path, &options.paths) {
                tracing::debug!(path = %path.display(), "skipping");
                continue;
            }
            let Some((base, target)) = self.versions(&path, options)? else {
                continue;
            };
            if let Some(fix) = fix_changed_lines(self.formatter, &self.style, &path, &base, &target)? {
                fixes.push(fix);
            }
        }
        Ok(fixes)
    }

    /// The (base, target) contents compared for `path` in the selected mode.
    fn versions(&self, path: &Path, options: &ApplyFormatOptions) -> GateResult<Option<(String, String)>> {
        let (base, target) = if options.staged {
            (
                self.git.read_revision_file_content("HEAD", path)?,
                Some(self.git.read_staged_file_content(path)?),
            )
        } else {
            let base = match &options.base {
                Some(revision) => self.git.read_revision_file_content(revision, path)?,
                None => match self.git.read_staged_file_content(path) {
                    Ok(content) => Some(content),
                    Err(GateError::NotStaged(_)) => None,
                    Err(err) => return Err(err),
                },
            };
            (base, self.git.read_working_file(path)?)
        };

        let Some(target) = target else {
            return Ok(None);
        };
        match (String::from_utf8(base.unwrap_or_default()), String::from_utf8(target)) {
            (Ok(base), Ok(target)) => Ok(Some((base, target))),
            _ => {
                tracing::warn!(path = %path.display(), "skipping file that is not UTF-8");
                Ok(None)
            }
        }
    }

    fn run_whole_file(&self, options: &ApplyFormatOptions, out: &mut dyn Write) -> GateResult<()> {
        if options.paths.is_empty() {
            return Err(GateError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "--whole-file needs at least one file",
            )));
        }

        for path in &options.paths {
            let content = self.git.read_working_file(path)?.ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )
            })?;
            let content = String::from_utf8(content).map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{} is not UTF-8", path.display()),
                )
            })?;
            let formatted = self.formatter.format(&FormatRequest {
                path,
                content: &content,
                style: &self.style,
                lines: &LineSelection::All,
            })?;

            if options.in_place {
                if formatted != content {
                    self.git.write_working_file(path, formatted.as_bytes())?;
                }
            } else {
                write!(out, "{formatted}")?;
            }
        }
        Ok(())
    }
}

/// True if `path` is one of `filters` or lies below one of them. No filters selects everything.
fn selected(path: &Path, filters: &[PathBuf]) -> bool {
    filters.is_empty()
        || filters
            .iter()
            .any(|filter| filter.as_os_str().is_empty() || filter == Path::new(".") || path.starts_with(filter))
}
