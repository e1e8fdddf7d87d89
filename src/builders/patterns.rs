use crate::core::error::{GateError, GateResult};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions clang-format knows how to handle. Anything else in the index is
/// left alone by both the hook and the helper.
static FORMATTABLE_EXTENSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(c|cc|cpp|c\+\+|cxx|h|hh|hpp|inc|cl|m|mm|js|ts|proto|protodevel|java|cs)$")
        .expect("extension pattern is valid")
});

/// Returns true if the formatter should look at `path`.
pub fn is_formattable(path: &Path) -> bool {
    FORMATTABLE_EXTENSIONS.is_match(&path_key(path))
}

/// Paths are matched with `/` separators so the ignore file works the same on every platform.
fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// A single line of the ignore file, compiled so that it must match the whole path.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    /// 1-based line in the ignore file the pattern came from.
    pub line: usize,
    /// The pattern as written by the user.
    pub specification: String,
    regex: Regex,
}

impl IgnorePattern {
    /// Compiles `specification` anchored at both ends, so `foo\.c` does not
    /// also ignore `src/foo.cpp`.
    pub fn new(line: usize, specification: &str) -> GateResult<Self> {
        let regex = Regex::new(&format!("^(?:{specification})$")).map_err(|source| {
            GateError::InvalidIgnorePattern {
                line,
                pattern: specification.to_string(),
                source,
            }
        })?;
        Ok(Self {
            line,
            specification: specification.to_string(),
            regex,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.regex.is_match(&path_key(path))
    }
}

impl fmt::Display for IgnorePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.specification, self.line)
    }
}

/// The ordered set of patterns loaded from the ignore file.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreList {
    /// Parses the ignore file format: one regular expression per line, blank
    /// lines and lines starting with `#` skipped.
    pub fn parse(content: &str) -> GateResult<Self> {
        let patterns = content
            .lines()
            .enumerate()
            .filter_map(|(index, raw)| {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    None
                } else {
                    Some(IgnorePattern::new(index + 1, trimmed))
                }
            })
            .collect::<GateResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Returns the first pattern matching `path`, if any.
    pub fn matching_pattern(&self, path: &Path) -> Option<&IgnorePattern> {
        self.patterns.iter().find(|pattern| pattern.matches(path))
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.matching_pattern(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
