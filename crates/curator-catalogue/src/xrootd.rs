//! Globbing over xrootd through the `xrdfs` command line client

use crate::errors::CatalogueError;
use crate::expander::local_glob;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

const CLIENT_EXECUTABLE: &str = "xrdfs";
const REMOTE_SCHEMES: &[&str] = &["root", "roots", "xroot", "xroots", "xrootd"];

/// A remote location split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    pub scheme: String,
    pub host: String,
    /// Absolute path on the server, single leading slash
    pub path: String,
}

impl RemoteUrl {
    /// Parse `root://host[:port]//path`; `None` for anything not served by xrootd
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.split_once("://")?;
        if !REMOTE_SCHEMES.contains(&scheme) {
            return None;
        }
        let (host, path) = rest.split_once('/')?;
        if host.is_empty() {
            return None;
        }
        Some(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            path: format!("/{}", path.trim_start_matches('/')),
        })
    }

    /// Render another server path on the same host
    pub fn with_path(&self, path: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.host, path)
    }
}

fn has_magic(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// One line of an `xrdfs ls -l` listing
#[derive(Debug, Clone, PartialEq, Eq)]
struct RemoteEntry {
    path: String,
    is_dir: bool,
}

impl RemoteEntry {
    /// Parse `dr-x 2024-01-01 00:00:00 4096 /store/run`; the flags come first, the path last
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let flags = fields.next()?;
        let path = fields.last()?;
        Some(Self {
            path: path.to_string(),
            is_dir: flags.starts_with('d'),
        })
    }

    fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(self.path.as_str())
    }
}

/// Handle on the `xrdfs` executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrdClient {
    executable: PathBuf,
}

impl XrdClient {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Find `xrdfs` on `PATH`
    pub fn locate() -> Option<Self> {
        which::which(CLIENT_EXECUTABLE).ok().map(Self::new)
    }

    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }

    /// Glob a pattern; non-xrootd patterns are globbed locally
    ///
    /// Only directories are descended into, and literal components are kept
    /// only when the server confirms they exist.
    pub fn glob(&self, pattern: &str) -> Result<Vec<String>, CatalogueError> {
        let Some(url) = RemoteUrl::parse(pattern) else {
            return local_glob(pattern);
        };

        let components: Vec<&str> = url.path.split('/').filter(|c| !c.is_empty()).collect();
        if components.is_empty() {
            return Ok(Vec::new());
        }
        let last = components.len().saturating_sub(1);
        let mut candidates = vec![String::new()];
        let mut pending = String::new();

        for (index, component) in components.iter().enumerate() {
            let is_last = index == last;
            if !has_magic(component) {
                pending.push('/');
                pending.push_str(component);
                if is_last {
                    candidates = self.confirm(&url, &candidates, &pending, false)?;
                }
                continue;
            }

            if !pending.is_empty() {
                candidates = self.confirm(&url, &candidates, &pending, true)?;
                pending.clear();
            }

            let matcher = glob::Pattern::new(component).map_err(|e| CatalogueError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            let mut next = Vec::new();
            for dir in &candidates {
                let listing_dir = if dir.is_empty() { "/" } else { dir.as_str() };
                for entry in self.list(&url, listing_dir)? {
                    if matcher.matches(entry.name()) && (is_last || entry.is_dir) {
                        next.push(format!("{}/{}", dir, entry.name()));
                    }
                }
            }
            candidates = next;
            if candidates.is_empty() {
                break;
            }
        }

        Ok(candidates.iter().map(|path| url.with_path(path)).collect())
    }

    /// Append `suffix` to every candidate, keeping those that exist
    fn confirm(
        &self,
        url: &RemoteUrl,
        candidates: &[String],
        suffix: &str,
        need_dir: bool,
    ) -> Result<Vec<String>, CatalogueError> {
        let mut confirmed = Vec::new();
        for candidate in candidates {
            let path = format!("{}{}", candidate, suffix);
            match self.stat(url, &path)? {
                Some(is_dir) if is_dir || !need_dir => confirmed.push(path),
                Some(_) => debug!("Skipping {}: not a directory", path),
                None => debug!("Skipping {}: not found", path),
            }
        }
        Ok(confirmed)
    }

    /// List a remote directory, sorted by path
    fn list(&self, url: &RemoteUrl, dir: &str) -> Result<Vec<RemoteEntry>, CatalogueError> {
        debug!("Listing {}:{}", url.host, dir);
        let output = Command::new(&self.executable)
            .args([url.host.as_str(), "ls", "-l", dir])
            .output()?;
        if !output.status.success() {
            return Err(CatalogueError::Remote {
                url: url.with_path(dir),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let mut entries: Vec<RemoteEntry> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(RemoteEntry::parse)
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// `Some(is_dir)` when `path` exists on the server
    fn stat(&self, url: &RemoteUrl, path: &str) -> Result<Option<bool>, CatalogueError> {
        let output = Command::new(&self.executable)
            .args([url.host.as_str(), "stat", path])
            .output()?;
        if !output.status.success() {
            return Ok(None);
        }
        let flags = String::from_utf8_lossy(&output.stdout);
        Ok(Some(flags.contains("IsDir")))
    }
}
