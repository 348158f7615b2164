use std::fmt;

/// A pull request as returned by the listing or search endpoints.
/// Never mutated after enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    /// PR number (e.g., 42)
    pub number: u64,
    /// Login of the user who opened the PR
    pub author: String,
    /// PR title
    pub title: String,
    /// Whether the PR was merged
    pub merged: bool,
}

/// Line changes of a single file within one PR diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// File path after the change (e.g., "src/auth/config.rs")
    pub path: String,
    /// Lines added in this file
    pub additions: u64,
    /// Lines deleted in this file
    pub deletions: u64,
}

/// An `owner/repo` pair identifying the target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Which pull requests take part in the run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Restrict to PRs opened by this login (switches to the search endpoint)
    pub filter_author: Option<String>,
    /// PR numbers to drop from the analysis
    pub exclude_prs: Vec<u64>,
    /// Keep PRs that were closed without merging
    pub include_unmerged: bool,
}
