#[cfg(test)]
mod tests {
    use crate::builders::hooks::{self, HookState};
    use crate::builders::patch::{FormatPatch, LineRange, changed_lines};
    use crate::builders::patterns::{IgnoreList, is_formattable};
    use crate::core::config::{
        ConfigManager, ConfigProvider, DEFAULT_STYLE, IGNORE_FILE_NAME, INTERACTIVE_KEY, STYLE_KEY,
    };
    use crate::core::engine::GateDecision;
    use crate::core::error::GateError;
    use crate::core::git::{Git2Client, GitClient};
    use git2::Repository;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    const CODE: &str = "int main() {\n  if (a) {\n  return a;\n  }\n  return 0;\n}\n";
    const FIXED: &str = "int main() {\n  if (a) {\n    return a;\n  }\n  return 0;\n}\n";

    fn setup_test_repo() -> (tempfile::TempDir, Repository, PathBuf) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let repo_path = dir.path().to_path_buf();
        (dir, repo, repo_path)
    }

    fn stage(repo: &Repository, repo_path: &Path, name: &str, content: &str) {
        fs::write(repo_path.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    #[test]
    fn test_ignore_list_skips_comments_and_blank_lines() {
        let list = IgnoreList::parse("# generated code\n\nfoo\\.c\n  third_party/.*  \n").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.is_ignored(Path::new("foo.c")));
        assert!(list.is_ignored(Path::new("third_party/lib/x.h")));
        assert!(!list.is_ignored(Path::new("src/main.c")));
    }

    #[test]
    fn test_ignore_patterns_match_the_whole_path() {
        let list = IgnoreList::parse("foo\\.c").unwrap();
        assert!(!list.is_ignored(Path::new("src/foo.c")));
        assert!(!list.is_ignored(Path::new("foo.cpp")));
        assert_eq!(
            list.matching_pattern(Path::new("foo.c")).unwrap().line,
            1
        );
    }

    #[test]
    fn test_invalid_ignore_pattern_reports_its_line() {
        let err = IgnoreList::parse("# ok\nfoo(\n").unwrap_err();
        match err {
            GateError::InvalidIgnorePattern { line, pattern, .. } => {
                assert_eq!(line, 2);
                assert_eq!(pattern, "foo(");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_formattable_extensions() {
        for path in ["foo.c", "a/b.CPP", "x.hh", "proto/y.proto", "Main.java"] {
            assert!(is_formattable(Path::new(path)), "{path}");
        }
        for path in ["README.md", "Makefile", "build.rs", "foo.c.orig"] {
            assert!(!is_formattable(Path::new(path)), "{path}");
        }
    }

    #[test]
    fn test_decision_tokens() {
        assert_eq!(GateDecision::parse("a\n"), Some(GateDecision::Apply));
        assert_eq!(GateDecision::parse(" F "), Some(GateDecision::Force));
        assert_eq!(GateDecision::parse("c"), Some(GateDecision::Cancel));
        assert_eq!(GateDecision::parse("apply"), None);
        assert_eq!(GateDecision::parse(""), None);
    }

    #[test]
    fn test_changed_lines_of_new_and_modified_files() {
        assert_eq!(
            changed_lines("", CODE).unwrap(),
            vec![LineRange { start: 1, end: 6 }]
        );
        assert_eq!(
            changed_lines(CODE, FIXED).unwrap(),
            vec![LineRange { start: 3, end: 3 }]
        );
        assert!(changed_lines(CODE, CODE).unwrap().is_empty());
        // A pure deletion leaves nothing to format.
        assert!(changed_lines(CODE, "int main() {\n  if (a) {\n  }\n  return 0;\n}\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_format_patch_rendering() {
        let patch = FormatPatch::between(Path::new("foo.c"), CODE, FIXED).unwrap();
        let expected = "--- foo.c\t(before formatting)\n\
                        +++ foo.c\t(after formatting)\n\
                        @@ -1,6 +1,6 @@\n \
                        int main() {\n   \
                        if (a) {\n\
                        -  return a;\n\
                        +    return a;\n   \
                        }\n   \
                        return 0;\n \
                        }\n";
        assert_eq!(patch.render(), expected);
        assert!(FormatPatch::between(Path::new("foo.c"), CODE, CODE)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_format_patch_applies_to_drifted_text() {
        let patch = FormatPatch::between(Path::new("foo.c"), CODE, FIXED).unwrap();
        let prefix = "// header\n#include <stdio.h>\n\n";
        let suffix = "\nstatic void foo() {\nbar();\n}\n";

        let drifted = format!("{prefix}{CODE}{suffix}");
        assert_eq!(
            patch.apply_to(&drifted).unwrap(),
            format!("{prefix}{FIXED}{suffix}")
        );
        assert_eq!(patch.apply_to(CODE).unwrap(), FIXED);
        assert!(patch.apply_to("int main() { return 0; }\n").is_none());
    }

    #[test]
    fn test_config_defaults() {
        let (_dir, _repo, repo_path) = setup_test_repo();
        let config = ConfigManager::new_at(repo_path).unwrap().load_config().unwrap();
        assert!(config.interactive);
        assert_eq!(config.style, DEFAULT_STYLE);
        assert!(config.ignore_list.is_empty());
    }

    #[test]
    fn test_config_from_git_and_ignore_file() {
        let (_dir, repo, repo_path) = setup_test_repo();
        let mut git_config = repo.config().unwrap();
        git_config.set_bool(INTERACTIVE_KEY, false).unwrap();
        git_config.set_str(STYLE_KEY, "WebKit").unwrap();
        fs::write(repo_path.join(IGNORE_FILE_NAME), "# vendored\nvendor/.*\n").unwrap();

        let manager = ConfigManager::new_at(repo_path.clone()).unwrap();
        let config = manager.load_config().unwrap();
        assert!(!config.interactive);
        assert_eq!(config.style, "WebKit");
        assert!(config.ignore_list.is_ignored(Path::new("vendor/zlib/zlib.h")));
        assert_eq!(manager.get_ignore_file_path(), repo_path.join(IGNORE_FILE_NAME));
    }

    #[test]
    fn test_hook_install_states() {
        let dir = tempdir().unwrap();
        let hooks_dir = dir.path().join("hooks");
        let binary = Path::new("/usr/local/bin/git-format-gate");
        let hook_path = hooks::pre_commit_hook_path(&hooks_dir);

        assert_eq!(hooks::hook_state(&hook_path).unwrap(), HookState::Missing);
        hooks::install_pre_commit_hook(&hooks_dir, binary).unwrap();
        assert_eq!(hooks::hook_state(&hook_path).unwrap(), HookState::Installed);

        assert!(matches!(
            hooks::install_pre_commit_hook(&hooks_dir, binary),
            Err(GateError::AlreadyInstalled(_))
        ));

        hooks::uninstall_pre_commit_hook(&hooks_dir).unwrap();
        assert!(!hook_path.exists());
        assert!(matches!(
            hooks::uninstall_pre_commit_hook(&hooks_dir),
            Err(GateError::NotInstalled(_))
        ));
    }

    #[test]
    fn test_foreign_hook_is_left_alone() {
        let dir = tempdir().unwrap();
        let hooks_dir = dir.path().to_path_buf();
        let hook_path = hooks::pre_commit_hook_path(&hooks_dir);
        fs::write(&hook_path, "").unwrap();

        assert!(matches!(
            hooks::install_pre_commit_hook(&hooks_dir, Path::new("/bin/gate")),
            Err(GateError::ForeignHook(_))
        ));
        assert!(matches!(
            hooks::uninstall_pre_commit_hook(&hooks_dir),
            Err(GateError::ForeignHook(_))
        ));
        assert_eq!(fs::read_to_string(&hook_path).unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_installed_hook_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let hook_path =
            hooks::install_pre_commit_hook(dir.path(), Path::new("/bin/gate")).unwrap();
        let mode = fs::metadata(hook_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_staged_content_round_trip() {
        let (_dir, repo, repo_path) = setup_test_repo();
        stage(&repo, &repo_path, "foo.c", CODE);
        // Unstaged edit after staging.
        fs::write(repo_path.join("foo.c"), format!("{CODE}// later\n")).unwrap();

        let git = Git2Client::new(&repo_path).unwrap();
        assert_eq!(git.get_staged_files().unwrap(), vec![PathBuf::from("foo.c")]);
        assert_eq!(git.read_staged_file_content(Path::new("foo.c")).unwrap(), CODE.as_bytes());
        assert_eq!(git.read_revision_file_content("HEAD", Path::new("foo.c")).unwrap(), None);

        git.write_staged_file_content(Path::new("foo.c"), FIXED.as_bytes())
            .unwrap();
        assert_eq!(git.read_staged_file_content(Path::new("foo.c")).unwrap(), FIXED.as_bytes());
        assert_eq!(
            fs::read_to_string(repo_path.join("foo.c")).unwrap(),
            format!("{CODE}// later\n")
        );

        git.commit("test").unwrap();
        assert!(git.get_staged_files().unwrap().is_empty());
        assert_eq!(
            git.read_revision_file_content("HEAD", Path::new("foo.c")).unwrap(),
            Some(FIXED.as_bytes().to_vec())
        );
        assert_eq!(git.get_unstaged_files().unwrap(), vec![PathBuf::from("foo.c")]);
    }

    #[test]
    fn test_writing_unknown_path_is_not_staged_error() {
        let (_dir, _repo, repo_path) = setup_test_repo();
        let git = Git2Client::new(&repo_path).unwrap();
        assert!(matches!(
            git.write_staged_file_content(Path::new("missing.c"), b""),
            Err(GateError::NotStaged(_))
        ));
    }

    #[test]
    fn test_hooks_dir_defaults_and_core_hooks_path() {
        let (_dir, repo, repo_path) = setup_test_repo();
        let git = Git2Client::new(&repo_path).unwrap();
        assert_eq!(
            fs::canonicalize(git.get_hooks_dir().unwrap().parent().unwrap()).unwrap(),
            fs::canonicalize(repo_path.join(".git")).unwrap()
        );

        repo.config().unwrap().set_str("core.hooksPath", "githooks").unwrap();
        let git = Git2Client::new(&repo_path).unwrap();
        assert_eq!(
            git.get_hooks_dir().unwrap(),
            git.get_repo_root().join("githooks")
        );
    }

    #[cfg(unix)]
    fn run_formatter_script(script: &str) -> Result<String, GateError> {
        use crate::builders::formatter::{ClangFormat, FormatRequest, Formatter};
        use crate::builders::patch::LineSelection;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let program = dir.path().join("clang-format");
        fs::write(&program, script).unwrap();
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();

        ClangFormat::new(&program, dir.path()).format(&FormatRequest {
            path: Path::new("foo.c"),
            content: CODE,
            style: "file",
            lines: &LineSelection::All,
        })
    }

    #[cfg(unix)]
    #[test]
    fn test_formatter_output_is_returned() {
        let formatted =
            run_formatter_script("#!/bin/sh\nexec sed -e 's/^  return a;$/    return a;/'\n").unwrap();
        assert_eq!(formatted, FIXED);
    }

    #[cfg(unix)]
    #[test]
    fn test_style_error_with_zero_exit_is_config_error() {
        let err = run_formatter_script(
            "#!/bin/sh\ncat >/dev/null\necho \"YAML:2:1: error: unknown key 'Foo'\" >&2\nexit 0\n",
        )
        .unwrap_err();
        match err {
            GateError::FormatConfig(message) => {
                assert_eq!(message, "YAML:2:1: error: unknown key 'Foo'")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_other_failure_is_formatter_failed() {
        let err = run_formatter_script("#!/bin/sh\ncat >/dev/null\necho 'out of memory' >&2\nexit 3\n")
            .unwrap_err();
        match err {
            GateError::FormatterFailed { path, stderr, .. } => {
                assert_eq!(path, PathBuf::from("foo.c"));
                assert_eq!(stderr, "out of memory");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_formatter_is_spawn_error() {
        use crate::builders::formatter::{ClangFormat, FormatRequest, Formatter};
        use crate::builders::patch::LineSelection;

        let dir = tempdir().unwrap();
        let err = ClangFormat::new(dir.path().join("no-such-clang-format"), dir.path())
            .format(&FormatRequest {
                path: Path::new("foo.c"),
                content: CODE,
                style: "file",
                lines: &LineSelection::All,
            })
            .unwrap_err();
        assert!(matches!(err, GateError::FormatterSpawn { .. }));
    }
}
