//! End-to-end orchestrator flows against in-memory port fakes.

mod common;

use std::path::{Path, PathBuf};

use common::{Harness, REPOSITORIES_DIR, StubForge, WORKSPACES_DIR};
use grove::error::Error;
use grove::forge::IssueInfo;
use grove::fs::Filesystem;
use grove::orchestrator::OperationOptions;
use grove::status::{Workspace, WorktreeInfo};
use grove::workspace::WorkspaceFile;

const REPO_CWD: &str = "/home/test/dev/example";
const ORIGIN_HTTPS: &str = "https://github.com/lerenn/example.git";
const ORIGIN_SSH: &str = "git@github.com:lerenn/example.git";
const REPO_ID: &str = "github.com/lerenn/example";

fn single_repo_harness() -> Harness {
    let h = Harness::new(REPO_CWD);
    h.add_repo(REPO_CWD, ORIGIN_HTTPS);
    h
}

fn force() -> OperationOptions {
    OperationOptions {
        force: Some(true),
        ..Default::default()
    }
}

fn worktree_dir(remote: &str, branch: &str) -> PathBuf {
    PathBuf::from(format!("{REPOSITORIES_DIR}/{REPO_ID}/{remote}/{branch}"))
}

// ---------------------------------------------------------------------
// Single-repository worktree lifecycle
// ---------------------------------------------------------------------

#[test]
fn create_worktree_single_repo_happy_path() {
    let mut h = single_repo_harness();
    let path = h
        .orchestrator
        .create_worktree(Some("feature-x"), &[])
        .unwrap();

    assert_eq!(path, worktree_dir("origin", "feature-x"));
    assert!(h.fs.exists(&path), "worktree directory must exist");

    let repo = h.orchestrator.status().repositories.get(REPO_ID).unwrap();
    assert_eq!(repo.worktrees.len(), 1);
    let info = repo.worktrees.get("origin:feature-x").unwrap();
    assert_eq!(info.remote, "origin");
    assert_eq!(info.branch, "feature-x");

    let worktree_cmds = h.git.commands_matching("worktree add");
    assert_eq!(worktree_cmds.len(), 1, "exactly one git worktree command");
}

#[test]
fn create_worktree_twice_fails_and_state_is_unchanged() {
    let mut h = single_repo_harness();
    h.orchestrator
        .create_worktree(Some("feature-x"), &[])
        .unwrap();
    let snapshot = h.orchestrator.status().clone();

    let second = h.orchestrator.create_worktree(Some("feature-x"), &[]);
    assert!(matches!(second, Err(Error::WorktreeExists { .. })));
    assert_eq!(h.orchestrator.status(), &snapshot);
}

#[test]
fn create_worktree_on_dirty_tree_requires_force() {
    let mut h = single_repo_harness();
    h.git.set_dirty(REPO_CWD);

    assert!(matches!(
        h.orchestrator.create_worktree(Some("feature-x"), &[]),
        Err(Error::RepositoryNotClean { .. })
    ));

    h.orchestrator
        .create_worktree(Some("feature-x"), &[force()])
        .unwrap();
}

#[test]
fn create_worktree_fails_when_directory_exists() {
    let mut h = single_repo_harness();
    h.fs
        .mkdirs(&worktree_dir("origin", "feature-x").display().to_string());

    assert!(matches!(
        h.orchestrator.create_worktree(Some("feature-x"), &[]),
        Err(Error::DirectoryExists { .. })
    ));
    assert!(h.orchestrator.status().repositories.is_empty());
}

#[test]
fn create_worktree_rolls_back_reservation_when_git_fails() {
    let mut h = single_repo_harness();
    let target = worktree_dir("origin", "feature-x");
    h.git.fail_worktree_at(&target);

    let result = h.orchestrator.create_worktree(Some("feature-x"), &[]);
    assert!(matches!(result, Err(Error::Git { .. })));

    // No residual reservation, no residual directory.
    let repo = h.orchestrator.status().repositories.get(REPO_ID).unwrap();
    assert!(repo.worktrees.is_empty());
    assert!(!h.fs.exists(&target));
}

#[test]
fn create_worktree_rejects_branch_with_colon_or_backslash() {
    let mut h = single_repo_harness();
    assert!(matches!(
        h.orchestrator.create_worktree(Some("origin:x"), &[]),
        Err(Error::InvalidBranch { .. })
    ));
    assert!(matches!(
        h.orchestrator.create_worktree(Some("feature\\x"), &[]),
        Err(Error::InvalidBranch { .. })
    ));
}

#[test]
fn branch_with_slash_creates_nested_directories() {
    let mut h = single_repo_harness();
    let path = h
        .orchestrator
        .create_worktree(Some("feature/sub/task"), &[])
        .unwrap();
    assert_eq!(path, worktree_dir("origin", "feature/sub/task"));
    assert!(h.fs.exists(&path));
}

// ---------------------------------------------------------------------
// Loading from remotes
// ---------------------------------------------------------------------

#[test]
fn load_adds_fork_remote_and_creates_worktree() {
    let mut h = Harness::new(REPO_CWD);
    h.add_repo(REPO_CWD, ORIGIN_SSH);
    h.git
        .set_remote_branches(REPO_CWD, "otheruser", &["feature-y"]);

    let path = h
        .orchestrator
        .load_worktree("otheruser:feature-y", &[])
        .unwrap();

    assert_eq!(path, worktree_dir("otheruser", "feature-y"));
    let remotes = h.git.remotes(REPO_CWD);
    assert_eq!(
        remotes.get("otheruser").map(String::as_str),
        Some("git@github.com:otheruser/example.git"),
        "fork remote derived from origin with the new owner"
    );
    assert_eq!(h.git.commands_matching("fetch otheruser").len(), 1);

    let info = h
        .orchestrator
        .status()
        .repositories
        .get(REPO_ID)
        .and_then(|r| r.worktrees.get("otheruser:feature-y"))
        .cloned()
        .unwrap();
    assert_eq!(info.remote, "otheruser");
}

#[test]
fn load_missing_branch_leaves_state_untouched() {
    let mut h = Harness::new(REPO_CWD);
    h.add_repo(REPO_CWD, ORIGIN_SSH);
    h.git.set_remote_branches(REPO_CWD, "otheruser", &[]);
    let snapshot = h.orchestrator.status().clone();

    let result = h.orchestrator.load_worktree("otheruser:feature-y", &[]);
    assert!(matches!(
        result,
        Err(Error::BranchNotFoundOnRemote { .. })
    ));

    assert_eq!(h.orchestrator.status(), &snapshot);
    assert!(!h.fs.exists(&worktree_dir("otheruser", "feature-y")));
    // The derived remote is rolled back too.
    assert!(!h.git.remotes(REPO_CWD).contains_key("otheruser"));
}

#[test]
fn load_with_empty_remote_source_defaults_to_origin() {
    let mut h = single_repo_harness();
    h.git
        .set_remote_branches(REPO_CWD, "origin", &["feature-y"]);

    let path = h.orchestrator.load_worktree("feature-y", &[]).unwrap();
    assert_eq!(path, worktree_dir("origin", "feature-y"));
    assert_eq!(h.git.commands_matching("fetch origin").len(), 1);
}

#[test]
fn load_failed_fetch_surfaces_fetch_failed() {
    let mut h = Harness::new(REPO_CWD);
    h.add_repo(REPO_CWD, ORIGIN_SSH);
    h.git.fail_fetch_from("otheruser");

    assert!(matches!(
        h.orchestrator.load_worktree("otheruser:feature-y", &[]),
        Err(Error::FetchFailed { .. })
    ));
    assert!(!h.git.remotes(REPO_CWD).contains_key("otheruser"));
}

// ---------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------

#[test]
fn delete_worktree_not_in_status_has_no_side_effects() {
    let mut h = single_repo_harness();
    let result = h.orchestrator.delete_worktree("never-existed", &[force()]);
    assert!(matches!(result, Err(Error::WorktreeNotInStatus { .. })));
    assert!(h.git.commands_matching("worktree remove").is_empty());
}

#[test]
fn delete_worktree_declined_confirmation_is_cancelled() {
    let mut h = single_repo_harness();
    h.orchestrator
        .create_worktree(Some("feature-x"), &[])
        .unwrap();
    h.prompt.queue("n");

    assert!(matches!(
        h.orchestrator.delete_worktree("feature-x", &[]),
        Err(Error::DeletionCancelled)
    ));
    assert!(
        h.orchestrator
            .status()
            .repositories
            .get(REPO_ID)
            .unwrap()
            .worktrees
            .contains_key("origin:feature-x")
    );
}

#[test]
fn delete_worktree_confirmed_removes_directory_and_entry() {
    let mut h = single_repo_harness();
    let path = h
        .orchestrator
        .create_worktree(Some("feature-x"), &[])
        .unwrap();
    h.prompt.queue("y");

    h.orchestrator.delete_worktree("feature-x", &[]).unwrap();
    assert!(!h.fs.exists(&path));
    assert!(
        h.orchestrator
            .status()
            .repositories
            .get(REPO_ID)
            .unwrap()
            .worktrees
            .is_empty()
    );
}

#[test]
fn delete_all_worktrees_with_force() {
    let mut h = single_repo_harness();
    h.orchestrator.create_worktree(Some("one"), &[]).unwrap();
    h.orchestrator.create_worktree(Some("two"), &[]).unwrap();

    h.orchestrator.delete_all_worktrees(&[force()]).unwrap();
    assert!(
        h.orchestrator
            .status()
            .repositories
            .get(REPO_ID)
            .unwrap()
            .worktrees
            .is_empty()
    );
}

// ---------------------------------------------------------------------
// Listing and opening
// ---------------------------------------------------------------------

#[test]
fn list_worktrees_is_sorted_by_remote_then_branch() {
    let mut h = single_repo_harness();
    h.git.set_remote_branches(REPO_CWD, "fork", &["b"]);
    h.orchestrator.create_worktree(Some("c"), &[]).unwrap();
    h.orchestrator.create_worktree(Some("a"), &[]).unwrap();
    h.orchestrator.load_worktree("fork:b", &[]).unwrap();

    let rows = h.orchestrator.list_worktrees(&[]).unwrap();
    let keys: Vec<String> = rows.iter().map(|row| row.info.key()).collect();
    assert_eq!(keys, vec!["fork:b", "origin:a", "origin:c"]);
    assert!(rows.iter().all(|row| row.repository == REPO_ID));
}

#[test]
fn open_worktree_returns_path_and_opens_ide() {
    let mut h = single_repo_harness();
    let created = h
        .orchestrator
        .create_worktree(Some("feature-x"), &[])
        .unwrap();

    let bundles = [OperationOptions {
        ide: Some("code".to_string()),
        ..Default::default()
    }];
    let opened = h.orchestrator.open_worktree("feature-x", &bundles).unwrap();
    assert_eq!(opened, created);

    let calls = h.ide.opened.lock().unwrap().clone();
    assert_eq!(calls, vec![("code".to_string(), created)]);
}

#[test]
fn open_unknown_worktree_fails() {
    let mut h = single_repo_harness();
    assert!(matches!(
        h.orchestrator.open_worktree("nope", &[]),
        Err(Error::WorktreeNotInStatus { .. })
    ));
    assert!(h.ide.opened.lock().unwrap().is_empty());
}

#[test]
fn conflicting_selectors_are_rejected() {
    let mut h = single_repo_harness();
    let bundles = [OperationOptions {
        workspace_name: Some("alpha".to_string()),
        repository_name: Some(REPO_ID.to_string()),
        ..Default::default()
    }];
    assert!(matches!(
        h.orchestrator.list_worktrees(&bundles),
        Err(Error::InvalidInput { .. })
    ));
}

// ---------------------------------------------------------------------
// Clone and repository listing
// ---------------------------------------------------------------------

#[test]
fn clone_lands_in_the_managed_layout_and_is_tracked() {
    let mut h = Harness::new("/home/test");
    let path = h
        .orchestrator
        .clone_repository(ORIGIN_HTTPS, &[])
        .unwrap();

    assert_eq!(path, worktree_dir("origin", "main"));
    let repo = h.orchestrator.status().repositories.get(REPO_ID).unwrap();
    assert_eq!(repo.path, path);
    assert!(repo.worktrees.contains_key("origin:main"));

    let rows = h.orchestrator.list_repositories().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, REPO_ID);
    assert_eq!(rows[0].worktree_count, 1);
}

#[test]
fn clone_twice_is_already_exists() {
    let mut h = Harness::new("/home/test");
    h.orchestrator.clone_repository(ORIGIN_HTTPS, &[]).unwrap();
    assert!(matches!(
        h.orchestrator.clone_repository(ORIGIN_HTTPS, &[]),
        Err(Error::RepositoryAlreadyExists { .. })
    ));
}

// ---------------------------------------------------------------------
// Issue-driven branches
// ---------------------------------------------------------------------

#[test]
fn create_worktree_from_issue_generates_branch_name() {
    let forge = StubForge::default().with_issue(IssueInfo {
        number: 123,
        title: "Fix flaky CI".to_string(),
        url: "https://github.com/lerenn/example/issues/123".to_string(),
    });
    let mut h = Harness::with_forge(REPO_CWD, forge);
    h.add_repo(REPO_CWD, ORIGIN_HTTPS);

    let bundles = [OperationOptions {
        issue: Some("123".to_string()),
        ..Default::default()
    }];
    let path = h.orchestrator.create_worktree(None, &bundles).unwrap();
    assert_eq!(path, worktree_dir("origin", "123-fix-flaky-ci"));

    let info = h
        .orchestrator
        .status()
        .repositories
        .get(REPO_ID)
        .and_then(|r| r.worktrees.get("origin:123-fix-flaky-ci"))
        .cloned()
        .unwrap();
    assert_eq!(info.issue.unwrap().number, 123);
}

#[test]
fn create_without_branch_or_issue_is_invalid() {
    let mut h = single_repo_harness();
    assert!(matches!(
        h.orchestrator.create_worktree(None, &[]),
        Err(Error::InvalidInput { .. })
    ));
}

// ---------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------

const ONE_ID: &str = "github.com/lerenn/one";
const TWO_ID: &str = "github.com/lerenn/two";
const ONE_CLONE: &str = "/clones/one";
const TWO_CLONE: &str = "/clones/two";

fn workspace_harness() -> Harness {
    let h = Harness::with_seed("/home/test", |store| {
        store
            .add_repository(ONE_ID, Path::new(ONE_CLONE))
            .unwrap();
        store
            .add_repository(TWO_ID, Path::new(TWO_CLONE))
            .unwrap();
        store
            .add_workspace("alpha", vec![ONE_ID.to_string(), TWO_ID.to_string()])
            .unwrap();
    });
    h.add_repo(ONE_CLONE, "https://github.com/lerenn/one.git");
    h.add_repo(TWO_CLONE, "https://github.com/lerenn/two.git");
    h
}

fn alpha() -> OperationOptions {
    OperationOptions {
        workspace_name: Some("alpha".to_string()),
        ..Default::default()
    }
}

#[test]
fn workspace_create_workspace_writes_manifest() {
    let mut h = Harness::with_seed("/home/test", |store| {
        store
            .add_repository(ONE_ID, Path::new(ONE_CLONE))
            .unwrap();
    });
    h.add_repo(ONE_CLONE, "https://github.com/lerenn/one.git");

    let file = h
        .orchestrator
        .create_workspace("beta", &[ONE_ID.to_string()], &[])
        .unwrap();
    assert_eq!(
        file,
        PathBuf::from(format!("{WORKSPACES_DIR}/beta.code-workspace"))
    );

    let manifest = WorkspaceFile::parse(&h.fs.file_contents(&file).unwrap()).unwrap();
    assert_eq!(manifest.name.as_deref(), Some("beta"));
    assert_eq!(manifest.folders.len(), 1);
    assert_eq!(manifest.folders[0].path, ONE_CLONE);
}

#[test]
fn workspace_create_rejects_unknown_members_and_bad_names() {
    let mut h = Harness::new("/home/test");
    assert!(matches!(
        h.orchestrator
            .create_workspace("beta", &["github.com/missing/repo".to_string()], &[]),
        Err(Error::RepositoryNotFound { .. })
    ));
    assert!(matches!(
        h.orchestrator
            .create_workspace("bad/name", &[ONE_ID.to_string()], &[]),
        Err(Error::InvalidInput { .. })
    ));
}

#[test]
fn list_workspaces_reports_members_and_branches() {
    let mut h = workspace_harness();
    h.orchestrator
        .create_worktree(Some("feature-x"), &[alpha()])
        .unwrap();

    let rows = h.orchestrator.list_workspaces().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "alpha");
    assert_eq!(rows[0].repositories, vec![ONE_ID, TWO_ID]);
    assert_eq!(rows[0].worktrees, vec!["feature-x"]);
}

#[test]
fn workspace_create_worktree_materializes_every_member() {
    let mut h = workspace_harness();

    let file = h
        .orchestrator
        .create_worktree(Some("feature-x"), &[alpha()])
        .unwrap();
    assert_eq!(
        file,
        PathBuf::from(format!("{WORKSPACES_DIR}/alpha-feature-x.code-workspace"))
    );

    for id in [ONE_ID, TWO_ID] {
        let info = h
            .orchestrator
            .status()
            .repositories
            .get(id)
            .and_then(|r| r.worktrees.get("origin:feature-x"))
            .cloned()
            .unwrap_or_else(|| panic!("worktree entry missing for {id}"));
        assert_eq!(info.workspace.as_deref(), Some(file.as_path()));
    }
    let workspace = h.orchestrator.status().workspaces.get("alpha").unwrap();
    assert_eq!(workspace.worktrees, vec!["feature-x".to_string()]);

    let manifest = WorkspaceFile::parse(&h.fs.file_contents(&file).unwrap()).unwrap();
    let folder_paths: Vec<String> = manifest.folders.iter().map(|f| f.path.clone()).collect();
    assert_eq!(
        folder_paths,
        vec![
            format!("{REPOSITORIES_DIR}/{ONE_ID}/origin/feature-x"),
            format!("{REPOSITORIES_DIR}/{TWO_ID}/origin/feature-x"),
        ]
    );
}

#[test]
fn workspace_create_worktree_rolls_back_when_a_member_fails() {
    let mut h = workspace_harness();
    let failing = PathBuf::from(format!("{REPOSITORIES_DIR}/{TWO_ID}/origin/feature-x"));
    h.git.fail_worktree_at(&failing);
    let snapshot = h.orchestrator.status().clone();

    let result = h.orchestrator.create_worktree(Some("feature-x"), &[alpha()]);
    assert!(matches!(result, Err(Error::Git { .. })));

    // Everything committed before the failure is unwound.
    assert_eq!(h.orchestrator.status(), &snapshot);
    let first_dir = PathBuf::from(format!("{REPOSITORIES_DIR}/{ONE_ID}/origin/feature-x"));
    assert!(!h.fs.exists(&first_dir));
    let file = PathBuf::from(format!("{WORKSPACES_DIR}/alpha-feature-x.code-workspace"));
    assert!(!h.fs.exists(&file));
}

#[test]
fn workspace_delete_declined_confirmation_keeps_everything() {
    let mut h = workspace_harness();
    h.orchestrator
        .create_worktree(Some("feature-x"), &[alpha()])
        .unwrap();
    h.prompt.queue("n");

    let result = h.orchestrator.delete_workspace("alpha", &[]);
    assert!(matches!(result, Err(Error::DeletionCancelled)));

    assert!(h.orchestrator.status().workspaces.contains_key("alpha"));
    for id in [ONE_ID, TWO_ID] {
        assert!(
            h.orchestrator
                .status()
                .repositories
                .get(id)
                .unwrap()
                .worktrees
                .contains_key("origin:feature-x")
        );
    }
}

#[test]
fn workspace_delete_force_removes_worktrees_files_and_entry() {
    let mut h = workspace_harness();
    let file = h
        .orchestrator
        .create_worktree(Some("feature-x"), &[alpha()])
        .unwrap();

    h.orchestrator.delete_workspace("alpha", &[force()]).unwrap();

    let status = h.orchestrator.status();
    assert!(!status.workspaces.contains_key("alpha"));
    // No entry anywhere still points at the deleted workspace's file.
    for repo in status.repositories.values() {
        assert!(
            repo.worktrees
                .values()
                .all(|info| info.workspace.as_deref() != Some(file.as_path()))
        );
    }
    assert!(!h.fs.exists(&file));
    assert!(!h.fs.exists(&PathBuf::from(format!(
        "{WORKSPACES_DIR}/alpha.code-workspace"
    ))));
}

#[test]
fn workspace_delete_worktree_updates_members_and_manifest_files() {
    let mut h = workspace_harness();
    let file = h
        .orchestrator
        .create_worktree(Some("feature-x"), &[alpha()])
        .unwrap();
    h.prompt.queue("y");

    h.orchestrator
        .delete_worktree("feature-x", &[alpha()])
        .unwrap();

    assert!(!h.fs.exists(&file));
    let workspace = h.orchestrator.status().workspaces.get("alpha").unwrap();
    assert!(workspace.worktrees.is_empty());
    for id in [ONE_ID, TWO_ID] {
        assert!(
            h.orchestrator
                .status()
                .repositories
                .get(id)
                .unwrap()
                .worktrees
                .is_empty()
        );
    }
}

#[test]
fn workspace_open_worktree_returns_manifest_path() {
    let mut h = workspace_harness();
    let file = h
        .orchestrator
        .create_worktree(Some("feature-x"), &[alpha()])
        .unwrap();

    let opened = h
        .orchestrator
        .open_worktree("feature-x", &[alpha()])
        .unwrap();
    assert_eq!(opened, file);
}

#[test]
fn workspace_mode_does_not_support_load() {
    let mut h = workspace_harness();
    assert!(matches!(
        h.orchestrator.load_worktree("feature-y", &[alpha()]),
        Err(Error::WorkspaceModeNotSupported { .. })
    ));
}

#[test]
fn workspace_detected_from_manifest_file_in_cwd() {
    let mut h = workspace_harness();
    h.fs.set_cwd("/home/test/ws");
    h.fs.mkdirs("/home/test/ws");
    h.fs
        .put_file("/home/test/ws/alpha.code-workspace", "{\"folders\": []}");

    let file = h
        .orchestrator
        .create_worktree(Some("feature-x"), &[])
        .unwrap();
    assert_eq!(
        file,
        PathBuf::from(format!("{WORKSPACES_DIR}/alpha-feature-x.code-workspace"))
    );
}

#[test]
fn mode_none_create_fails_with_repository_not_found() {
    let mut h = Harness::new("/home/test/empty");
    assert!(matches!(
        h.orchestrator.create_worktree(Some("feature-x"), &[]),
        Err(Error::GitRepositoryNotFound { .. })
    ));
}

#[test]
fn unknown_workspace_name_fails() {
    let mut h = Harness::new("/home/test");
    let bundles = [OperationOptions {
        workspace_name: Some("ghost".to_string()),
        ..Default::default()
    }];
    assert!(matches!(
        h.orchestrator.create_worktree(Some("x"), &bundles),
        Err(Error::WorkspaceNotFound { .. })
    ));
}

// ---------------------------------------------------------------------
// Seeded-state invariants
// ---------------------------------------------------------------------

#[test]
fn workspace_members_recover_remotes_from_repository_entries() {
    let mut h = Harness::with_seed("/home/test", |store| {
        store
            .add_repository(ONE_ID, Path::new(ONE_CLONE))
            .unwrap();
        store
            .add_workspace("alpha", vec![ONE_ID.to_string()])
            .unwrap();
        let mut info = WorktreeInfo::new("fork", "feature-x");
        info.workspace = Some(PathBuf::from(format!(
            "{WORKSPACES_DIR}/alpha-feature-x.code-workspace"
        )));
        store.add_worktree(ONE_ID, info).unwrap();
        store
            .update_workspace(
                "alpha",
                Workspace {
                    repositories: vec![ONE_ID.to_string()],
                    worktrees: vec!["feature-x".to_string()],
                },
            )
            .unwrap();
    });
    h.add_repo(ONE_CLONE, "https://github.com/lerenn/one.git");

    // Branch names in the workspace carry no remote prefix; listing finds
    // the member entry under its own remote.
    let rows = h.orchestrator.list_worktrees(&[alpha()]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].info.remote, "fork");
    assert_eq!(rows[0].info.branch, "feature-x");
}
