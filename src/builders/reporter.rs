use colored::Colorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::builders::patch::FormatPatch;

/// Full prompt shown once per commit attempt.
pub const DECISION_PROMPT: &str = "What would you like to do? [a/f/c] ";
/// Shorter prompt used after an invalid answer.
pub const RETRY_PROMPT: &str = "Please type a, f or c: ";

/// Writes the gate's messages for the person committing.
///
/// Everything goes to the injected writer; git forwards the hook's output to
/// the terminal.
pub struct ConsoleReporter<'w> {
    out: &'w mut dyn Write,
}

impl<'w> ConsoleReporter<'w> {
    pub fn new(out: &'w mut dyn Write) -> Self {
        Self { out }
    }

    pub fn patches<'p>(&mut self, patches: impl IntoIterator<Item = &'p FormatPatch>) -> io::Result<()> {
        for patch in patches {
            write!(self.out, "{}", patch.render())?;
        }
        Ok(())
    }

    pub fn needs_formatting(&mut self, files: &[PathBuf]) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "The staged content is not formatted correctly.")?;
        writeln!(self.out, "The following files need formatting:")?;
        for file in files {
            writeln!(self.out, "  {}", file.display().to_string().bold())?;
        }
        Ok(())
    }

    pub fn choices(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "The fix shown above can be applied automatically to the commit."
        )?;
        writeln!(self.out)?;
        writeln!(self.out, "You can:")?;
        writeln!(self.out, " [a]: Apply the fix")?;
        writeln!(self.out, " [f]: Force and commit anyway (not recommended!)")?;
        writeln!(self.out, " [c]: Cancel the commit")?;
        writeln!(self.out)?;
        self.prompt(DECISION_PROMPT)
    }

    pub fn prompt(&mut self, prompt: &str) -> io::Result<()> {
        write!(self.out, "{prompt}")?;
        self.out.flush()
    }

    pub fn invalid_choice(&mut self, answer: &str) -> io::Result<()> {
        writeln!(self.out, "Invalid choice {:?}.", answer.trim())
    }

    /// Terminates a prompt line left open by an EOF on the input.
    pub fn end_prompt(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn non_interactive(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(
            self.out,
            "Fix it with `git-format-gate apply-format --staged -i`, or skip the check with `git commit --no-verify`."
        )
    }

    pub fn patching(&mut self, path: &Path) -> io::Result<()> {
        writeln!(self.out, "patching file {}", path.display())
    }

    pub fn working_tree_conflict(&mut self, path: &Path) -> io::Result<()> {
        writeln!(
            self.out,
            "{} the fix could not be applied to the working tree copy of {}; only the staged content was fixed.",
            "warning:".yellow().bold(),
            path.display()
        )
    }

    pub fn forced(&mut self) -> io::Result<()> {
        writeln!(self.out, "Will commit anyway!")?;
        self.prompt("Press return to continue.\n")
    }
}
