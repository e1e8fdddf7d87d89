use crate::core::error::{GateError, GateResult};
use git2::{Delta, Diff, DiffOptions, ErrorCode, Index, Oid, Repository, Signature, Tree};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Trait defining the Git operations required by the gate and the helper.
/// This abstraction allows for easier testing and decoupling from specific git implementations.
pub trait GitClient {
    /// Returns the files whose staged content differs from `HEAD`, deletions excluded.
    fn get_staged_files(&self) -> GateResult<Vec<PathBuf>>;

    /// Returns the files whose working tree content differs from the index, deletions excluded.
    fn get_unstaged_files(&self) -> GateResult<Vec<PathBuf>>;

    /// Returns the files whose working tree content differs from `revision`.
    fn get_changed_files_since(&self, revision: &str) -> GateResult<Vec<PathBuf>>;

    /// Reads the content of a file as it exists in the staging area (index).
    fn read_staged_file_content(&self, path: &Path) -> GateResult<Vec<u8>>;

    /// Replaces the staged content of a file that is already in the index.
    fn write_staged_file_content(&self, path: &Path, content: &[u8]) -> GateResult<()>;

    /// Reads a file from a revision's tree. `None` when the file or an unborn `HEAD` is absent.
    fn read_revision_file_content(&self, revision: &str, path: &Path)
    -> GateResult<Option<Vec<u8>>>;

    /// Read file from working directory, `None` if it does not exist.
    fn read_working_file(&self, path: &Path) -> GateResult<Option<Vec<u8>>>;

    /// Write file to working directory
    fn write_working_file(&self, path: &Path, content: &[u8]) -> GateResult<()>;

    /// Returns the root path of the work tree.
    fn get_repo_root(&self) -> PathBuf;

    /// Returns the directory git runs hooks from.
    fn get_hooks_dir(&self) -> GateResult<PathBuf>;

    /// Records the index as a new commit on `HEAD`.
    fn commit(&self, message: &str) -> GateResult<Oid>;
}

/// Concrete implementation of GitClient using the git2 crate.
pub struct Git2Client {
    repo: Repository,
    /// A second index that receives every staged write, see `from_env`.
    mirror_index: Option<PathBuf>,
}

impl Git2Client {
    pub fn new<P: AsRef<Path>>(path: P) -> GateResult<Self> {
        let repo = Repository::open(path)?;
        Ok(Self {
            repo,
            mirror_index: None,
        })
    }

    /// Opens the repository the way a hook sees it: `GIT_DIR` and friends are
    /// honored, and the index named by `GIT_INDEX_FILE` becomes the staging area.
    ///
    /// A partial commit (`git commit <paths>`) hands the hook a temporary
    /// index while the locked `index.lock` becomes the repository index once
    /// the commit is done. Staged writes then go to both.
    pub fn from_env() -> GateResult<Self> {
        let repo = Repository::open_from_env()?;
        let mut mirror_index = None;
        if let Some(index_file) = std::env::var_os("GIT_INDEX_FILE") {
            tracing::debug!(index = ?index_file, "using index from GIT_INDEX_FILE");
            let index_file = PathBuf::from(index_file);
            let mut index = Index::open(&index_file)?;
            repo.set_index(&mut index)?;

            let locked = repo.path().join("index.lock");
            if locked.exists() && fs::canonicalize(&index_file).ok() != fs::canonicalize(&locked).ok() {
                tracing::debug!(index = %locked.display(), "partial commit, mirroring staged writes");
                mirror_index = Some(locked);
            }
        }
        Ok(Self { repo, mirror_index })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Converts a path given on the command line into a path relative to the work tree.
    pub fn relative_to_root(&self, path: &Path) -> GateResult<PathBuf> {
        let root = fs::canonicalize(self.get_repo_root())?;
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        // The file may not exist yet, so only the parent is canonicalized.
        let absolute = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) if parent.exists() => fs::canonicalize(parent)?.join(name),
            _ => absolute,
        };
        Ok(absolute
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or(absolute))
    }

    /// The index, reloaded if another process rewrote it since the last read.
    fn index(&self) -> GateResult<Index> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        Ok(index)
    }

    /// Replaces `path` in a standalone index file, if that index tracks it.
    fn write_mirror_index(&self, index_path: &Path, path: &Path, content: &[u8]) -> GateResult<()> {
        let mut index = Index::open(index_path)?;
        let Some(mut entry) = index.get_path(path, 0) else {
            return Ok(());
        };
        entry.id = self.repo.blob(content)?;
        entry.file_size = u32::try_from(content.len()).unwrap_or(u32::MAX);
        index.add(&entry)?;
        index.write()?;
        Ok(())
    }

    fn revision_tree(&self, revision: &str) -> GateResult<Option<Tree<'_>>> {
        match self.repo.revparse_single(revision) {
            Ok(object) => Ok(Some(object.peel_to_tree()?)),
            Err(err)
                if revision == "HEAD"
                    && matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Collects the new-side paths of a diff, skipping deleted files.
fn changed_paths(diff: &Diff<'_>) -> Vec<PathBuf> {
    diff.deltas()
        .filter(|delta| delta.status() != Delta::Deleted)
        .filter_map(|delta| delta.new_file().path().map(Path::to_path_buf))
        .collect()
}

impl GitClient for Git2Client {
    fn get_staged_files(&self) -> GateResult<Vec<PathBuf>> {
        let index = self.index()?;
        let head_tree = self.revision_tree("HEAD")?;
        let mut options = DiffOptions::new();

        // An unborn HEAD diffs against the empty tree, which makes every entry staged.
        let diff =
            self.repo
                .diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut options))?;
        Ok(changed_paths(&diff))
    }

    fn get_unstaged_files(&self) -> GateResult<Vec<PathBuf>> {
        let index = self.index()?;
        let mut options = DiffOptions::new();
        let diff = self
            .repo
            .diff_index_to_workdir(Some(&index), Some(&mut options))?;
        Ok(changed_paths(&diff))
    }

    fn get_changed_files_since(&self, revision: &str) -> GateResult<Vec<PathBuf>> {
        let tree = self.revision_tree(revision)?;
        let mut options = DiffOptions::new();
        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(tree.as_ref(), Some(&mut options))?;
        Ok(changed_paths(&diff))
    }

    fn read_staged_file_content(&self, path: &Path) -> GateResult<Vec<u8>> {
        let index = self.index()?;
        let entry = index
            .get_path(path, 0)
            .ok_or_else(|| GateError::NotStaged(path.to_path_buf()))?;
        let blob = self.repo.find_blob(entry.id)?;
        Ok(blob.content().to_vec())
    }

    fn write_staged_file_content(&self, path: &Path, content: &[u8]) -> GateResult<()> {
        let mut index = self.index()?;
        let mut entry = index
            .get_path(path, 0)
            .ok_or_else(|| GateError::NotStaged(path.to_path_buf()))?;
        entry.file_size = u32::try_from(content.len()).unwrap_or(u32::MAX);
        index.add_frombuffer(&entry, content)?;
        index.write()?;
        if let Some(mirror) = &self.mirror_index {
            self.write_mirror_index(mirror, path, content)?;
        }
        Ok(())
    }

    fn read_revision_file_content(
        &self,
        revision: &str,
        path: &Path,
    ) -> GateResult<Option<Vec<u8>>> {
        let Some(tree) = self.revision_tree(revision)? else {
            return Ok(None);
        };
        match tree.get_path(path) {
            Ok(entry) => {
                let blob = entry.to_object(&self.repo)?.peel_to_blob()?;
                Ok(Some(blob.content().to_vec()))
            }
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn read_working_file(&self, path: &Path) -> GateResult<Option<Vec<u8>>> {
        match fs::read(self.get_repo_root().join(path)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_working_file(&self, path: &Path, content: &[u8]) -> GateResult<()> {
        fs::write(self.get_repo_root().join(path), content)?;
        Ok(())
    }

    fn get_repo_root(&self) -> PathBuf {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .to_path_buf()
    }

    fn get_hooks_dir(&self) -> GateResult<PathBuf> {
        let config = self.repo.config()?;
        match config.get_path("core.hooksPath") {
            Ok(hooks_path) if hooks_path.is_absolute() => Ok(hooks_path),
            Ok(hooks_path) => Ok(self.get_repo_root().join(hooks_path)),
            // Linked work trees share the hooks of the main repository.
            Err(err) if err.code() == ErrorCode::NotFound => Ok(self.repo.commondir().join("hooks")),
            Err(err) => Err(err.into()),
        }
    }

    fn commit(&self, message: &str) -> GateResult<Oid> {
        let mut index = self.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self
            .repo
            .signature()
            .or_else(|_| Signature::now("git-format-gate", "git-format-gate@localhost"))?;
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(err) if matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(err) => return Err(err.into()),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        Ok(oid)
    }
}
