use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::types::Oid;

use super::error::VcsError;

/// Delay applied before `fetch`/`ls_remote` to tolerate eventual consistency
/// in the upstream platform's ref advertisement, and between successive
/// status posts to respect rate limits. Not a performance knob — see the
/// concurrency & resource model.
pub const QUIESCENCE_DELAY: Duration = Duration::from_secs(1);

/// A ref and the object id it currently points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchEntry {
    pub name: String,
    pub oid: Oid,
}

/// An entry from `ls-remote`: the advertised sha and the remote ref name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub oid: Oid,
    pub refname: String,
}

/// Options controlling how a diff's file headers are rendered.
#[derive(Debug, Clone, Default)]
pub struct DiffPrefixes {
    pub src_prefix: Option<String>,
    pub dst_prefix: Option<String>,
}

/// Run a blocking `VcsGateway` operation on the blocking thread pool rather
/// than an async reactor thread (§4.B) — every call site touching `fetch`,
/// `ls_remote`, `diff`, or `log` is a subprocess spawn (and `fetch`/
/// `ls_remote` also pay the full [`QUIESCENCE_DELAY`]), so running it
/// in-line on a reactor thread would stall every other delivery sharing
/// that worker.
pub async fn run_blocking<T, F>(vcs: &Arc<VcsGateway>, f: F) -> Result<T, VcsError>
where
    F: FnOnce(&VcsGateway) -> Result<T, VcsError> + Send + 'static,
    T: Send + 'static,
{
    let vcs = Arc::clone(vcs);
    tokio::task::spawn_blocking(move || f(&vcs)).await?
}

/// The single doorway to all Git operations used by the bot.
///
/// Wraps a `git2::Repository` (for ref reads/writes and ancestry queries)
/// plus the path to a `git` binary (for the handful of primitives that need
/// Git's own plumbing text format or network transport).
pub struct VcsGateway {
    // `git2::Repository` is `Send` but not `Sync`; this service shares one
    // `VcsGateway` across concurrent deliveries (for different PR families)
    // and across axum's worker threads, so the handle itself needs its own
    // lock independent of the business-level family lock in `lock.rs`.
    repo: Mutex<git2::Repository>,
    repo_path: PathBuf,
    git_binary: PathBuf,
}

impl VcsGateway {
    /// Open (or initialize, if absent) the on-disk repository backing the
    /// snapshot registry. The registry repository has no working tree
    /// requirement — it exists purely to hold refs and objects.
    pub fn open(repo_path: impl AsRef<Path>) -> Result<Self, VcsError> {
        let repo_path = repo_path.as_ref().to_path_buf();
        let repo = match git2::Repository::open(&repo_path) {
            Ok(repo) => repo,
            Err(_) => git2::Repository::init_bare(&repo_path)?,
        };
        Ok(Self {
            repo: Mutex::new(repo),
            repo_path,
            git_binary: PathBuf::from("git"),
        })
    }

    fn run_git<I, S>(&self, args: I) -> Result<std::process::Output, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<std::ffi::OsString> =
            args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let output = Command::new(&self.git_binary)
            .arg("-C")
            .arg(&self.repo_path)
            .args(&args)
            .output()?;
        Ok(output)
    }

    fn run_git_text<I, S>(&self, args: I) -> Result<String, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr> + Into<String> + Clone,
    {
        let args_vec: Vec<S> = args.into_iter().collect();
        let output = self.run_git(args_vec.iter().cloned())?;
        if !output.status.success() {
            return Err(VcsError::Command {
                args: args_vec.into_iter().map(Into::into).collect(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| VcsError::NonUtf8Output)
    }

    // -- network primitives (subprocess: git2 requires remote-callback setup
    // for SSH auth that the system git agent already handles) -------------

    /// `git fetch <remote> <refspec>`. Applies the quiescence delay first.
    pub fn fetch(&self, remote: &str, refspec: &str) -> Result<(), VcsError> {
        std::thread::sleep(QUIESCENCE_DELAY);
        let output = self.run_git(["fetch", remote, refspec])?;
        if !output.status.success() {
            return Err(VcsError::Command {
                args: vec!["fetch".into(), remote.into(), refspec.into()],
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }

    /// `git ls-remote <remote> <pattern>`. Applies the quiescence delay first.
    pub fn ls_remote(&self, remote: &str, pattern: &str) -> Result<Vec<RemoteRef>, VcsError> {
        std::thread::sleep(QUIESCENCE_DELAY);
        let text = self.run_git_text(["ls-remote", remote, pattern])?;
        let mut refs = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(sha), Some(refname)) = (parts.next(), parts.next()) else {
                continue;
            };
            if let Ok(oid) = Oid::new(sha) {
                refs.push(RemoteRef {
                    oid,
                    refname: refname.to_string(),
                });
            }
        }
        Ok(refs)
    }

    // -- text-producing plumitives (subprocess: need Git's own formatting) -

    /// `git log --format=full <range>`, raw text for the commit-log parser.
    pub fn log_full(&self, range: &str) -> Result<String, VcsError> {
        self.run_git_text(["log", "--format=full", range])
    }

    /// `git log --oneline <range>`, raw text.
    pub fn log_oneline(&self, range: &str) -> Result<String, VcsError> {
        self.run_git_text(["log", "--oneline", range])
    }

    /// `git log [-p] <range>`, raw text. `patch` mirrors the `show_diffs`
    /// query parameter on the commit-log-diff routes.
    pub fn log(&self, range: &str, patch: bool) -> Result<String, VcsError> {
        if patch {
            self.run_git_text(["log", "-p", range])
        } else {
            self.run_git_text(["log", range])
        }
    }

    /// `git diff [--src-prefix=.. --dst-prefix=..] <range_or_a..b>`, raw text.
    pub fn diff(&self, range: &str, prefixes: &DiffPrefixes) -> Result<String, VcsError> {
        let mut args = vec!["diff".to_string()];
        if let Some(src) = &prefixes.src_prefix {
            args.push(format!("--src-prefix={src}"));
        }
        if let Some(dst) = &prefixes.dst_prefix {
            args.push(format!("--dst-prefix={dst}"));
        }
        args.push(range.to_string());
        self.run_git_text(args)
    }

    /// `git show --check <sha>`, translating exit code to a boolean: `true`
    /// iff the commit's diff has whitespace issues.
    pub fn show_check(&self, sha: &Oid) -> Result<bool, VcsError> {
        let output = self.run_git(["show", "--check", sha.as_str()])?;
        Ok(!output.status.success())
    }

    // -- ref management (git2: CAS semantics, no subprocess needed) -------

    /// Create a branch ref at `start_point`. Fails if the ref already exists.
    pub fn create_branch(&self, refname: &str, start_point: &Oid) -> Result<(), VcsError> {
        let full_ref = format!("refs/heads/{refname}");
        if self.try_resolve_ref(&full_ref)?.is_some() {
            let actual = self.try_resolve_ref(&full_ref)?.unwrap();
            return Err(VcsError::CasFailed {
                refname: full_ref,
                expected: "<none>".to_string(),
                actual: actual.to_string(),
            });
        }
        let oid = git2::Oid::from_str(start_point.as_str())?;
        let repo = self.repo.lock().expect("vcs repo lock poisoned");
        repo.reference(&full_ref, oid, false, "gitbot: create snapshot")?;
        Ok(())
    }

    /// Force-update (or create) a branch ref to `sha`, unconditionally.
    pub fn update_ref(&self, refname: &str, sha: &Oid) -> Result<(), VcsError> {
        let full_ref = format!("refs/heads/{refname}");
        let oid = git2::Oid::from_str(sha.as_str())?;
        let repo = self.repo.lock().expect("vcs repo lock poisoned");
        repo.reference(&full_ref, oid, true, "gitbot: advance snapshot")?;
        Ok(())
    }

    /// List branches whose name matches `glob` (a `fnmatch`-style pattern
    /// over `refs/heads/<glob>`), in the order `git2` enumerates them.
    pub fn list_branches(&self, glob: &str) -> Result<Vec<BranchEntry>, VcsError> {
        let pattern = format!("refs/heads/{glob}");
        let repo = self.repo.lock().expect("vcs repo lock poisoned");
        let refs = repo.references_glob(&pattern)?;
        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference?;
            let Some(name) = reference.name() else {
                continue;
            };
            let Some(stripped) = name.strip_prefix("refs/heads/") else {
                continue;
            };
            let Some(target) = reference.target() else {
                continue;
            };
            entries.push(BranchEntry {
                name: stripped.to_string(),
                oid: Oid::new(target.to_string())?,
            });
        }
        Ok(entries)
    }

    fn try_resolve_ref(&self, full_refname: &str) -> Result<Option<Oid>, VcsError> {
        let repo = self.repo.lock().expect("vcs repo lock poisoned");
        match repo.find_reference(full_refname) {
            Ok(reference) => match reference.target() {
                Some(oid) => Ok(Some(Oid::new(oid.to_string())?)),
                None => Ok(None),
            },
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// `true` iff `ancestor` is reachable from `descendant` (or they're equal).
    /// Exit-code polarity note: the underlying `merge-base --is-ancestor`
    /// convention returns 0 (success) when the relation holds; this method
    /// already normalizes that into a plain boolean.
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, VcsError> {
        if ancestor == descendant {
            return Ok(true);
        }
        let ancestor_oid = git2::Oid::from_str(ancestor.as_str())?;
        let descendant_oid = git2::Oid::from_str(descendant.as_str())?;
        let repo = self.repo.lock().expect("vcs repo lock poisoned");
        Ok(repo.graph_descendant_of(descendant_oid, ancestor_oid)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn init_repo() -> (tempfile::TempDir, VcsGateway) {
        let dir = tempfile::tempdir().unwrap();
        StdCommand::new("git")
            .args(["init", "-q"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        StdCommand::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        StdCommand::new("git")
            .args(["config", "user.name", "Test User"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        let gateway = VcsGateway::open(dir.path()).unwrap();
        (dir, gateway)
    }

    fn commit(dir: &Path, message: &str) -> Oid {
        std::fs::write(dir.join("file.txt"), message).unwrap();
        StdCommand::new("git")
            .args(["add", "-A"])
            .current_dir(dir)
            .output()
            .unwrap();
        StdCommand::new("git")
            .args(["commit", "-q", "-m", message])
            .current_dir(dir)
            .output()
            .unwrap();
        let out = StdCommand::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(dir)
            .output()
            .unwrap();
        Oid::new(String::from_utf8(out.stdout).unwrap().trim()).unwrap()
    }

    #[test]
    fn create_branch_then_resolve() {
        let (dir, gw) = init_repo();
        let sha = commit(dir.path(), "first");
        gw.create_branch("snap/0", &sha).unwrap();
        let entries = gw.list_branches("snap/*").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].oid, sha);
    }

    #[test]
    fn create_branch_twice_fails() {
        let (dir, gw) = init_repo();
        let sha = commit(dir.path(), "first");
        gw.create_branch("snap/0", &sha).unwrap();
        assert!(gw.create_branch("snap/0", &sha).is_err());
    }

    #[test]
    fn update_ref_advances_without_touching_others() {
        let (dir, gw) = init_repo();
        let sha1 = commit(dir.path(), "first");
        gw.create_branch("snap/base", &sha1).unwrap();
        gw.create_branch("snap/head", &sha1).unwrap();
        let sha2 = commit(dir.path(), "second");
        gw.update_ref("snap/head", &sha2).unwrap();

        let branches = gw.list_branches("snap/*").unwrap();
        let base = branches.iter().find(|b| b.name == "snap/base").unwrap();
        let head = branches.iter().find(|b| b.name == "snap/head").unwrap();
        assert_eq!(base.oid, sha1);
        assert_eq!(head.oid, sha2);
    }

    #[test]
    fn is_ancestor_true_for_fast_forward() {
        let (dir, gw) = init_repo();
        let sha1 = commit(dir.path(), "first");
        let sha2 = commit(dir.path(), "second");
        assert!(gw.is_ancestor(&sha1, &sha2).unwrap());
    }

    #[test]
    fn is_ancestor_false_for_unrelated_commits() {
        let (dir, gw) = init_repo();
        let sha1 = commit(dir.path(), "first");
        StdCommand::new("git")
            .args(["checkout", "-q", "--orphan", "other"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        let sha2 = commit(dir.path(), "second");
        assert!(!gw.is_ancestor(&sha1, &sha2).unwrap());
    }

    #[test]
    fn log_full_contains_commit_header() {
        let (dir, gw) = init_repo();
        let sha1 = commit(dir.path(), "first");
        let sha2 = commit(dir.path(), "second");
        let text = gw.log_full(&format!("{sha1}..{sha2}")).unwrap();
        assert!(text.contains("commit "));
        assert!(text.contains("Author:"));
    }
}
