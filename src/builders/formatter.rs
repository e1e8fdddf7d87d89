use crate::builders::patch::LineSelection;
use crate::core::error::{GateError, GateResult};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Fragments clang-format prints when the style it was given cannot be used.
/// Old releases print them and still exit 0, so they are checked before the status.
const CONFIG_ERROR_MARKERS: &[&str] = &[
    "unknown key",
    "Error reading",
    "Error parsing -style",
    "Invalid value for -style",
];

/// One formatting job: format `content`, which belongs to `path`, restricted to `lines`.
#[derive(Debug, Clone, Copy)]
pub struct FormatRequest<'a> {
    pub path: &'a Path,
    pub content: &'a str,
    pub style: &'a str,
    pub lines: &'a LineSelection,
}

/// The source formatter collaborator.
pub trait Formatter {
    /// Returns the canonically formatted content.
    fn format(&self, request: &FormatRequest<'_>) -> GateResult<String>;
}

/// Runs the `clang-format` executable.
pub struct ClangFormat {
    program: OsString,
    working_dir: PathBuf,
}

impl ClangFormat {
    /// `working_dir` should be the work tree root so that `--style=file`
    /// finds the repository's `.clang-format`.
    pub fn new(program: impl Into<OsString>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
        }
    }

    fn arguments(request: &FormatRequest<'_>) -> Vec<String> {
        let mut args = vec![
            format!("--style={}", request.style),
            format!("--assume-filename={}", request.path.display()),
        ];
        if let LineSelection::Ranges(ranges) = request.lines {
            args.extend(
                ranges
                    .iter()
                    .map(|range| format!("--lines={}:{}", range.start, range.end)),
            );
        }
        args
    }
}

impl Formatter for ClangFormat {
    fn format(&self, request: &FormatRequest<'_>) -> GateResult<String> {
        let program = self.program.to_string_lossy().into_owned();
        tracing::debug!(%program, path = %request.path.display(), lines = ?request.lines, "running formatter");

        let mut child = Command::new(&self.program)
            .args(Self::arguments(request))
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GateError::FormatterSpawn {
                program: program.clone(),
                source,
            })?;

        // Feed stdin from another thread so a large file cannot fill both pipes.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            GateError::Io(std::io::Error::other("formatter stdin was not captured"))
        })?;
        let content = request.content.to_owned();
        let writer = thread::spawn(move || stdin.write_all(content.as_bytes()));

        let output = child.wait_with_output()?;
        match writer.join() {
            Ok(Ok(())) => {}
            // The formatter may exit before reading everything; its status says why.
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                return Err(GateError::Io(std::io::Error::other(
                    "formatter stdin writer panicked",
                )));
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if CONFIG_ERROR_MARKERS.iter().any(|marker| stderr.contains(marker)) {
            return Err(GateError::FormatConfig(stderr.trim_end().to_string()));
        }
        if !output.status.success() {
            return Err(GateError::FormatterFailed {
                path: request.path.to_path_buf(),
                status: output.status.to_string(),
                stderr: stderr.trim_end().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| GateError::FormatterFailed {
            path: request.path.to_path_buf(),
            status: output.status.to_string(),
            stderr: "formatter produced output that is not UTF-8".to_string(),
        })
    }
}
