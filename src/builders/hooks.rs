use crate::core::error::{GateError, GateResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker line identifying a hook written by `install`.
pub const HOOK_MARKER: &str = "# git-format-gate pre-commit hook";

const PRE_COMMIT: &str = "pre-commit";

/// What currently sits where git looks for the pre-commit hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Missing,
    Installed,
    Foreign,
}

pub fn pre_commit_hook_path(hooks_dir: &Path) -> PathBuf {
    hooks_dir.join(PRE_COMMIT)
}

/// Inspects the pre-commit hook. Anything that is not our script, including
/// an empty file or a dangling symlink, counts as someone else's hook.
pub fn hook_state(hook_path: &Path) -> GateResult<HookState> {
    if fs::symlink_metadata(hook_path).is_err() {
        return Ok(HookState::Missing);
    }
    match fs::read_to_string(hook_path) {
        Ok(content) if content.lines().any(|line| line == HOOK_MARKER) => Ok(HookState::Installed),
        _ => Ok(HookState::Foreign),
    }
}

/// Writes the pre-commit hook that runs `binary pre-commit`.
pub fn install_pre_commit_hook(hooks_dir: &Path, binary: &Path) -> GateResult<PathBuf> {
    let hook_path = pre_commit_hook_path(hooks_dir);
    match hook_state(&hook_path)? {
        HookState::Installed => return Err(GateError::AlreadyInstalled(hook_path)),
        HookState::Foreign => return Err(GateError::ForeignHook(hook_path)),
        HookState::Missing => {}
    }

    fs::create_dir_all(hooks_dir)?;
    fs::write(&hook_path, render_pre_commit_hook(binary))?;

    // Make executable on Unix systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&hook_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&hook_path, perms)?;
    }

    tracing::info!(hook = %hook_path.display(), "installed pre-commit hook");
    Ok(hook_path)
}

/// Removes the pre-commit hook, refusing to touch one we did not write.
pub fn uninstall_pre_commit_hook(hooks_dir: &Path) -> GateResult<PathBuf> {
    let hook_path = pre_commit_hook_path(hooks_dir);
    match hook_state(&hook_path)? {
        HookState::Missing => Err(GateError::NotInstalled(hook_path)),
        HookState::Foreign => Err(GateError::ForeignHook(hook_path)),
        HookState::Installed => {
            fs::remove_file(&hook_path)?;
            tracing::info!(hook = %hook_path.display(), "removed pre-commit hook");
            Ok(hook_path)
        }
    }
}

fn render_pre_commit_hook(binary: &Path) -> String {
    let binary = shell_quote(&binary.to_string_lossy());
    format!(
        r#"#!/bin/sh
{HOOK_MARKER}
# Remove with `git-format-gate uninstall`.

GATE={binary}

if [ ! -x "$GATE" ]; then
    echo "Warning: $GATE not found, skipping the formatting check" >&2
    exit 0
fi

exec "$GATE" pre-commit "$@"
"#
    )
}

/// Single-quotes `value` for `/bin/sh`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_paths_with_single_quotes() {
        assert_eq!(shell_quote("/opt/it's/gate"), r"'/opt/it'\''s/gate'");
    }

    #[test]
    fn script_carries_marker_and_binary() {
        let script = render_pre_commit_hook(Path::new("/usr/local/bin/git-format-gate"));
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.lines().any(|line| line == HOOK_MARKER));
        assert!(script.contains("GATE='/usr/local/bin/git-format-gate'"));
        assert!(script.contains(r#"exec "$GATE" pre-commit "$@""#));
    }
}
