//! In-memory fakes for the capability ports, so orchestrator flows run
//! without touching git, the network, or the real filesystem.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use grove::config::Config;
use grove::error::{Error, Result};
use grove::forge::{Forge, IssueInfo, IssueRef};
use grove::fs::Filesystem;
use grove::git::Git;
use grove::ide::Ide;
use grove::orchestrator::{Orchestrator, Ports};
use grove::prompt::Prompt;
use grove::status::{MemoryBackend, StatusStore};

// ---------------------------------------------------------------------
// Filesystem fake
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct FakeFilesystem {
    dirs: Mutex<BTreeSet<PathBuf>>,
    files: Mutex<BTreeMap<PathBuf, String>>,
    cwd: Mutex<PathBuf>,
}

impl FakeFilesystem {
    pub fn new(cwd: &str) -> Self {
        let fs = Self::default();
        *fs.cwd.lock().unwrap() = PathBuf::from(cwd);
        fs.mkdirs(cwd);
        fs
    }

    pub fn mkdirs(&self, path: &str) {
        let mut dirs = self.dirs.lock().unwrap();
        let mut current = PathBuf::new();
        for component in Path::new(path).components() {
            current.push(component);
            dirs.insert(current.clone());
        }
    }

    pub fn set_cwd(&self, path: &str) {
        *self.cwd.lock().unwrap() = PathBuf::from(path);
    }

    pub fn put_file(&self, path: &str, contents: &str) {
        if let Some(parent) = Path::new(path).parent() {
            self.mkdirs(&parent.display().to_string());
        }
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), contents.to_string());
    }

    pub fn file_contents(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

impl Filesystem for FakeFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path) || self.files.lock().unwrap().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.mkdirs(&path.display().to_string());
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        self.dirs
            .lock()
            .unwrap()
            .retain(|dir| !dir.starts_with(path));
        self.files
            .lock()
            .unwrap()
            .retain(|file, _| !file.starts_with(path));
        Ok(())
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        // Supports the one shape the core uses: `<dir>/*<suffix>`.
        let (prefix, suffix) = pattern.split_once('*').ok_or_else(|| Error::InvalidInput {
            reason: format!("unsupported glob pattern '{pattern}'"),
        })?;
        let matches: Vec<PathBuf> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|path| {
                let s = path.display().to_string();
                s.starts_with(prefix)
                    && s.ends_with(suffix)
                    && !s[prefix.len()..s.len() - suffix.len()].contains('/')
            })
            .cloned()
            .collect();
        Ok(matches)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        self.file_contents(path).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            ))
        })
    }

    fn write_file_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        self.put_file(&path.display().to_string(), contents);
        Ok(())
    }

    fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    fn expand_path(&self, input: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(
            input.replace('~', "/home/test").as_str(),
        ))
    }

    fn home_dir(&self) -> Option<PathBuf> {
        Some(PathBuf::from("/home/test"))
    }

    fn current_dir(&self) -> Result<PathBuf> {
        Ok(self.cwd.lock().unwrap().clone())
    }

    fn validate_repository_path(&self, path: &Path) -> Result<()> {
        if !self.is_dir(path) {
            return Err(Error::RepositoryNotFound {
                name: path.display().to_string(),
            });
        }
        if !self.exists(&path.join(".git")) {
            return Err(Error::GitRepositoryNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Git fake
// ---------------------------------------------------------------------

#[derive(Default)]
struct RepoState {
    remotes: BTreeMap<String, String>,
    branches: BTreeSet<String>,
    /// remote name -> branches it advertises
    remote_branches: BTreeMap<String, BTreeSet<String>>,
    clean: bool,
}

#[derive(Default)]
pub struct FakeGit {
    repos: Mutex<BTreeMap<PathBuf, RepoState>>,
    /// Worktree target paths whose `git worktree add` should fail.
    fail_worktree_at: Mutex<BTreeSet<PathBuf>>,
    /// Remotes whose fetch should fail.
    fail_fetch: Mutex<BTreeSet<String>>,
    /// Every invocation, for assertions.
    pub log: Mutex<Vec<String>>,
    /// Default branch advertised for clones.
    pub default_branch: Mutex<String>,
    /// Shared with the filesystem fake so worktree creation materializes
    /// directories the way the real adapter does.
    fs: Mutex<Option<Arc<FakeFilesystem>>>,
}

impl FakeGit {
    pub fn new() -> Self {
        let git = Self::default();
        *git.default_branch.lock().unwrap() = "main".to_string();
        git
    }

    pub fn attach_fs(&self, fs: Arc<FakeFilesystem>) {
        *self.fs.lock().unwrap() = Some(fs);
    }

    pub fn add_repo(&self, root: &str, origin_url: &str) {
        let mut repos = self.repos.lock().unwrap();
        let state = repos.entry(PathBuf::from(root)).or_default();
        state
            .remotes
            .insert("origin".to_string(), origin_url.to_string());
        state.branches.insert("main".to_string());
        state.clean = true;
    }

    pub fn set_dirty(&self, root: &str) {
        if let Some(state) = self.repos.lock().unwrap().get_mut(Path::new(root)) {
            state.clean = false;
        }
    }

    pub fn set_remote_branches(&self, root: &str, remote: &str, branches: &[&str]) {
        if let Some(state) = self.repos.lock().unwrap().get_mut(Path::new(root)) {
            state.remote_branches.insert(
                remote.to_string(),
                branches.iter().map(|b| b.to_string()).collect(),
            );
        }
    }

    pub fn fail_worktree_at(&self, path: &Path) {
        self.fail_worktree_at
            .lock()
            .unwrap()
            .insert(path.to_path_buf());
    }

    pub fn fail_fetch_from(&self, remote: &str) {
        self.fail_fetch.lock().unwrap().insert(remote.to_string());
    }

    pub fn remotes(&self, root: &str) -> BTreeMap<String, String> {
        self.repos
            .lock()
            .unwrap()
            .get(Path::new(root))
            .map(|state| state.remotes.clone())
            .unwrap_or_default()
    }

    pub fn commands_matching(&self, needle: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .cloned()
            .collect()
    }

    fn record(&self, line: String) {
        self.log.lock().unwrap().push(line);
    }
}

impl Git for FakeGit {
    fn status(&self, repo: &Path) -> Result<String> {
        Ok(if self.is_clean(repo)? {
            String::new()
        } else {
            " M src/lib.rs".to_string()
        })
    }

    fn is_clean(&self, repo: &Path) -> Result<bool> {
        Ok(self
            .repos
            .lock()
            .unwrap()
            .get(repo)
            .map(|state| state.clean)
            .unwrap_or(true))
    }

    fn is_git_repository(&self, path: &Path) -> bool {
        self.repos.lock().unwrap().contains_key(path)
    }

    fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool> {
        Ok(self
            .repos
            .lock()
            .unwrap()
            .get(repo)
            .is_some_and(|state| state.branches.contains(branch)))
    }

    fn branch_exists_on_remote(&self, repo: &Path, remote: &str, branch: &str) -> Result<bool> {
        Ok(self
            .repos
            .lock()
            .unwrap()
            .get(repo)
            .and_then(|state| state.remote_branches.get(remote))
            .is_some_and(|branches| branches.contains(branch)))
    }

    fn create_branch(&self, repo: &Path, branch: &str, start_point: Option<&str>) -> Result<()> {
        self.record(format!(
            "branch {branch}{}",
            start_point.map(|s| format!(" {s}")).unwrap_or_default()
        ));
        self.repos
            .lock()
            .unwrap()
            .get_mut(repo)
            .ok_or_else(|| Error::GitRepositoryNotFound {
                path: repo.to_path_buf(),
            })?
            .branches
            .insert(branch.to_string());
        Ok(())
    }

    fn get_branch_remote(&self, _repo: &Path, _branch: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn create_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()> {
        self.record(format!(
            "worktree add {} {branch} [{}]",
            path.display(),
            repo.display()
        ));
        if self.fail_worktree_at.lock().unwrap().contains(path) {
            return Err(Error::Git {
                command: format!("git worktree add {} {branch}", path.display()),
                output: "fatal: could not create work tree".to_string(),
            });
        }
        if let Some(fs) = self.fs.lock().unwrap().as_ref() {
            fs.mkdirs(&path.display().to_string());
        }
        Ok(())
    }

    fn remove_worktree(&self, repo: &Path, path: &Path, force: bool) -> Result<()> {
        self.record(format!(
            "worktree remove{} {} [{}]",
            if force { " --force" } else { "" },
            path.display(),
            repo.display()
        ));
        if let Some(fs) = self.fs.lock().unwrap().as_ref() {
            fs.remove_all(path)?;
        }
        Ok(())
    }

    fn remote_exists(&self, repo: &Path, remote: &str) -> Result<bool> {
        Ok(self
            .repos
            .lock()
            .unwrap()
            .get(repo)
            .is_some_and(|state| state.remotes.contains_key(remote)))
    }

    fn add_remote(&self, repo: &Path, name: &str, url: &str) -> Result<()> {
        self.record(format!("remote add {name} {url}"));
        self.repos
            .lock()
            .unwrap()
            .get_mut(repo)
            .ok_or_else(|| Error::GitRepositoryNotFound {
                path: repo.to_path_buf(),
            })?
            .remotes
            .insert(name.to_string(), url.to_string());
        Ok(())
    }

    fn remove_remote(&self, repo: &Path, name: &str) -> Result<()> {
        self.record(format!("remote remove {name}"));
        self.repos
            .lock()
            .unwrap()
            .get_mut(repo)
            .ok_or_else(|| Error::GitRepositoryNotFound {
                path: repo.to_path_buf(),
            })?
            .remotes
            .remove(name);
        Ok(())
    }

    fn get_remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>> {
        Ok(self
            .repos
            .lock()
            .unwrap()
            .get(repo)
            .and_then(|state| state.remotes.get(remote).cloned()))
    }

    fn fetch_remote(&self, _repo: &Path, remote: &str) -> Result<()> {
        self.record(format!("fetch {remote}"));
        if self.fail_fetch.lock().unwrap().contains(remote) {
            return Err(Error::FetchFailed {
                remote: remote.to_string(),
                output: "could not resolve host".to_string(),
            });
        }
        Ok(())
    }

    fn get_repository_name(&self, repo: &Path) -> Result<String> {
        Ok(repo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default())
    }

    fn remote_default_branch(&self, _url: &str) -> Result<String> {
        Ok(self.default_branch.lock().unwrap().clone())
    }

    fn clone(&self, url: &str, target: &Path) -> Result<()> {
        self.record(format!("clone {url} {}", target.display()));
        if let Some(fs) = self.fs.lock().unwrap().as_ref() {
            fs.mkdirs(&target.display().to_string());
            fs.mkdirs(&target.join(".git").display().to_string());
        }
        let mut repos = self.repos.lock().unwrap();
        let state = repos.entry(target.to_path_buf()).or_default();
        state.remotes.insert("origin".to_string(), url.to_string());
        state
            .branches
            .insert(self.default_branch.lock().unwrap().clone());
        state.clean = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Prompt, IDE, forge fakes
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, answer: &str) {
        self.answers
            .lock()
            .unwrap()
            .push_back(answer.to_string());
    }
}

impl Prompt for ScriptedPrompt {
    fn read_line(&self, _message: &str) -> Result<String> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(Error::UserCancelled)
    }
}

#[derive(Default)]
pub struct RecordingIde {
    pub opened: Mutex<Vec<(String, PathBuf)>>,
}

impl Ide for RecordingIde {
    fn open(&self, ide_name: &str, path: &Path, _verbose: bool) -> Result<()> {
        self.opened
            .lock()
            .unwrap()
            .push((ide_name.to_string(), path.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
pub struct StubForge {
    issues: Mutex<BTreeMap<u64, IssueInfo>>,
}

impl StubForge {
    pub fn with_issue(self, info: IssueInfo) -> Self {
        self.issues.lock().unwrap().insert(info.number, info);
        self
    }
}

impl Forge for StubForge {
    fn get_issue_info(&self, issue: &IssueRef) -> Result<IssueInfo> {
        self.issues
            .lock()
            .unwrap()
            .get(&issue.number)
            .cloned()
            .ok_or_else(|| Error::InvalidIssueRef {
                reference: format!("{}/{}#{}", issue.owner, issue.repo, issue.number),
            })
    }
}

// ---------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------

pub struct Harness {
    pub fs: Arc<FakeFilesystem>,
    pub git: Arc<FakeGit>,
    pub prompt: Arc<ScriptedPrompt>,
    pub ide: Arc<RecordingIde>,
    pub orchestrator: Orchestrator,
}

pub const REPOSITORIES_DIR: &str = "/code/repositories";
pub const WORKSPACES_DIR: &str = "/code/workspaces";

impl Harness {
    pub fn new(cwd: &str) -> Self {
        Self::build(cwd, StubForge::default(), |_| {})
    }

    pub fn with_seed(cwd: &str, seed: impl FnOnce(&mut StatusStore)) -> Self {
        Self::build(cwd, StubForge::default(), seed)
    }

    pub fn with_forge(cwd: &str, forge: StubForge) -> Self {
        Self::build(cwd, forge, |_| {})
    }

    fn build(cwd: &str, forge: StubForge, seed: impl FnOnce(&mut StatusStore)) -> Self {
        let fs = Arc::new(FakeFilesystem::new(cwd));
        let git = Arc::new(FakeGit::new());
        git.attach_fs(fs.clone());
        let prompt = Arc::new(ScriptedPrompt::new());
        let ide = Arc::new(RecordingIde::default());

        let mut store = StatusStore::open(Box::new(MemoryBackend::new()))
            .expect("empty store always opens");
        seed(&mut store);

        let config = Config {
            repositories_dir: PathBuf::from(REPOSITORIES_DIR),
            workspaces_dir: PathBuf::from(WORKSPACES_DIR),
            status_file: PathBuf::from("/code/status.json"),
            non_interactive: false,
        };
        let ports = Ports {
            fs: fs.clone(),
            git: git.clone(),
            prompt: prompt.clone(),
            ide: ide.clone(),
            forge: Arc::new(forge),
        };
        let orchestrator = Orchestrator::new(config, ports, store);

        Self {
            fs,
            git,
            prompt,
            ide,
            orchestrator,
        }
    }

    /// Register a git repository in both fakes: a work tree with a `.git`
    /// directory and an origin remote.
    pub fn add_repo(&self, root: &str, origin_url: &str) {
        self.fs.mkdirs(root);
        self.fs.mkdirs(&format!("{root}/.git"));
        self.git.add_repo(root, origin_url);
    }
}
