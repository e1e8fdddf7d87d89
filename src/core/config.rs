use crate::builders::patterns::IgnoreList;
use crate::core::error::GateResult;
use git2::{Config, ErrorCode, Repository};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Git configuration switch turning the interactive prompt on or off.
pub const INTERACTIVE_KEY: &str = "hooks.clangFormatDiffInteractive";
/// Git configuration entry holding the `--style` value passed to the formatter.
pub const STYLE_KEY: &str = "hooks.clangFormatDiffStyle";
/// Ignore file, looked up at the root of the work tree.
pub const IGNORE_FILE_NAME: &str = ".clang-format-hook-ignore";
/// Style used when none is configured: the repository's `.clang-format`.
pub const DEFAULT_STYLE: &str = "file";

/// Configuration for one invocation. It is loaded again every time the hook runs.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub interactive: bool,
    pub style: String,
    pub ignore_list: IgnoreList,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            interactive: true,
            style: DEFAULT_STYLE.to_string(),
            ignore_list: IgnoreList::default(),
        }
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> GateResult<GateConfig>;
    fn get_ignore_file_path(&self) -> PathBuf;
}

/// Reads `GateConfig` from git configuration and the ignore file.
pub struct ConfigManager {
    config: Config,
    repo_root: PathBuf,
}

impl ConfigManager {
    pub fn new(repo: &Repository) -> GateResult<Self> {
        let repo_root = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        // String lookups need a snapshot; a live `Config` refuses them.
        let config = repo.config()?.snapshot()?;
        Ok(Self { config, repo_root })
    }

    pub fn new_at(repo_root: PathBuf) -> GateResult<Self> {
        let repo = Repository::open(&repo_root)?;
        Self::new(&repo)
    }

    fn read_bool(&self, key: &str) -> GateResult<Option<bool>> {
        match self.config.get_bool(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn read_string(&self, key: &str) -> GateResult<Option<String>> {
        match self.config.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn load_ignore_list(&self) -> GateResult<IgnoreList> {
        match fs::read_to_string(self.get_ignore_file_path()) {
            Ok(content) => IgnoreList::parse(&content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(IgnoreList::default()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> GateResult<GateConfig> {
        let interactive = self.read_bool(INTERACTIVE_KEY)?.unwrap_or(true);
        let style = self
            .read_string(STYLE_KEY)?
            .map(|style| style.trim().to_string())
            .filter(|style| !style.is_empty())
            .unwrap_or_else(|| DEFAULT_STYLE.to_string());
        let ignore_list = self.load_ignore_list()?;

        tracing::debug!(
            interactive,
            %style,
            ignore_patterns = ignore_list.len(),
            "loaded gate configuration"
        );
        Ok(GateConfig {
            interactive,
            style,
            ignore_list,
        })
    }

    fn get_ignore_file_path(&self) -> PathBuf {
        self.repo_root.join(IGNORE_FILE_NAME)
    }
}
