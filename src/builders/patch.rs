use crate::core::error::GateResult;
use git2::{DiffOptions, Patch};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Context lines kept around each change in a format patch.
const PATCH_CONTEXT_LINES: u32 = 3;

/// An inclusive, 1-based range of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// Which lines of a file the formatter may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSelection {
    All,
    Ranges(Vec<LineRange>),
}

impl LineSelection {
    /// True when there is nothing the formatter is allowed to change.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Ranges(ranges) if ranges.is_empty())
    }
}

/// Computes the lines of `after` that were added or modified relative to `before`.
///
/// Pure deletions produce no range: there is nothing left on the new side to format.
pub fn changed_lines(before: &str, after: &str) -> GateResult<Vec<LineRange>> {
    let mut options = DiffOptions::new();
    options.context_lines(0);
    let patch = Patch::from_buffers(
        before.as_bytes(),
        None,
        after.as_bytes(),
        None,
        Some(&mut options),
    )?;

    let mut ranges = Vec::new();
    for hunk_index in 0..patch.num_hunks() {
        let (hunk, _) = patch.hunk(hunk_index)?;
        if hunk.new_lines() > 0 {
            let start = hunk.new_start() as usize;
            ranges.push(LineRange {
                start,
                end: start + hunk.new_lines() as usize - 1,
            });
        }
    }
    Ok(ranges)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchLine {
    Context(String),
    Removed(String),
    Added(String),
}

impl PatchLine {
    fn text(&self) -> &str {
        match self {
            Self::Context(text) | Self::Removed(text) | Self::Added(text) => text,
        }
    }

    fn prefix(&self) -> char {
        match self {
            Self::Context(_) => ' ',
            Self::Removed(_) => '-',
            Self::Added(_) => '+',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchHunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<PatchLine>,
}

impl PatchHunk {
    /// The lines this hunk expects to find in the text it is applied to.
    fn old_side(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|line| !matches!(line, PatchLine::Added(_)))
            .map(PatchLine::text)
            .collect()
    }

    /// 0-based index of the first old-side line. libgit2 reports the line
    /// *before* an insertion when the old side is empty.
    fn old_index(&self) -> usize {
        if self.old_lines == 0 {
            self.old_start
        } else {
            self.old_start.saturating_sub(1)
        }
    }
}

/// The difference between a file's content and its formatted version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPatch {
    pub path: PathBuf,
    pub hunks: Vec<PatchHunk>,
}

impl FormatPatch {
    pub fn between(path: &Path, before: &str, after: &str) -> GateResult<Self> {
        let mut options = DiffOptions::new();
        options.context_lines(PATCH_CONTEXT_LINES);
        let patch = Patch::from_buffers(
            before.as_bytes(),
            Some(path),
            after.as_bytes(),
            Some(path),
            Some(&mut options),
        )?;

        let mut hunks = Vec::with_capacity(patch.num_hunks());
        for hunk_index in 0..patch.num_hunks() {
            let (hunk, line_count) = patch.hunk(hunk_index)?;
            let mut lines = Vec::with_capacity(line_count);
            for line_index in 0..line_count {
                let line = patch.line_in_hunk(hunk_index, line_index)?;
                let text = String::from_utf8_lossy(line.content()).into_owned();
                match line.origin() {
                    ' ' => lines.push(PatchLine::Context(text)),
                    '-' => lines.push(PatchLine::Removed(text)),
                    '+' => lines.push(PatchLine::Added(text)),
                    // End-of-file newline markers; the line text already says it.
                    _ => {}
                }
            }
            hunks.push(PatchHunk {
                old_start: hunk.old_start() as usize,
                old_lines: hunk.old_lines() as usize,
                new_start: hunk.new_start() as usize,
                new_lines: hunk.new_lines() as usize,
                lines,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            hunks,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Renders the patch as a unified diff, the way it is shown to the person committing.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.is_empty() {
            return out;
        }
        let path = self.path.display();
        let _ = writeln!(out, "--- {path}\t(before formatting)");
        let _ = writeln!(out, "+++ {path}\t(after formatting)");
        for hunk in &self.hunks {
            let _ = writeln!(
                out,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
            );
            for line in &hunk.lines {
                out.push(line.prefix());
                out.push_str(line.text());
                if !line.text().ends_with('\n') {
                    out.push_str("\n\\ No newline at end of file\n");
                }
            }
        }
        out
    }

    /// Applies the patch to `text`, which may have drifted from the content
    /// the patch was computed on. Each hunk is looked up by its old side,
    /// starting where the previous hunks left off. Returns `None` if a hunk
    /// cannot be found.
    pub fn apply_to(&self, text: &str) -> Option<String> {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut drift: isize = 0;

        for hunk in &self.hunks {
            let old_side = hunk.old_side();
            let expected = hunk.old_index().saturating_add_signed(drift);
            let position = locate(&lines, &old_side, expected, cursor)?;

            lines[cursor..position]
                .iter()
                .for_each(|line| result.push_str(line));
            for line in &hunk.lines {
                if !matches!(line, PatchLine::Removed(_)) {
                    result.push_str(line.text());
                }
            }
            cursor = position + old_side.len();
            drift = position as isize - hunk.old_index() as isize;
        }

        lines[cursor..].iter().for_each(|line| result.push_str(line));
        Some(result)
    }
}

/// Finds `needle` in `lines` at or after `min`, preferring the position closest to `expected`.
fn locate(lines: &[&str], needle: &[&str], expected: usize, min: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(expected.clamp(min, lines.len()));
    }
    let max = lines.len().checked_sub(needle.len())?;
    if min > max {
        return None;
    }
    let expected = expected.clamp(min, max);
    let fits = |position: usize| lines[position..position + needle.len()] == *needle;

    for distance in 0..=(max - min) {
        let before = expected.checked_sub(distance).filter(|p| *p >= min);
        let after = Some(expected + distance).filter(|p| *p <= max);
        if before.is_none() && after.is_none() {
            break;
        }
        if let Some(position) = before.into_iter().chain(after).find(|p| fits(*p)) {
            return Some(position);
        }
    }
    None
}
