pub mod client;
pub mod diff;
pub mod types;

pub use client::GitHubClient;
pub use types::{FileChange, PullRequestRef, RepoId, Selection};

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Hard ceiling on how many results GitHub's search API will page through.
pub const SEARCH_RESULT_LIMIT: u64 = 1000;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid repository '{0}', expected 'owner/repo' or a github.com URL")]
    InvalidRepository(String),

    #[error("Failed to parse diff: {0}")]
    DiffParse(String),

    #[error(
        "GitHub reported {total_count} results, but the search API will only retrieve the first {limit}. \
         Drop --filter-author to use the pulls API instead",
        limit = SEARCH_RESULT_LIMIT
    )]
    SearchOverflow { total_count: u64 },

    #[error(
        "GitHub rejected {url} with HTTP 422. For private repositories the token needs \
         the 'repo' scope (or read access to pull requests for fine-grained tokens)"
    )]
    InsufficientPrivileges { url: String },

    #[error(
        "GitHub API rate limit exhausted{}. Use --token or GITHUB_TOKEN for a higher limit",
        rate_limit_detail(.limit, .resets_in)
    )]
    RateLimited {
        limit: Option<u64>,
        resets_in: Option<u64>,
    },

    #[error("Not found: {url}. Check the repository name, or pass a token for private repositories")]
    NotFound { url: String },

    #[error("GitHub API returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

fn rate_limit_detail(limit: &Option<u64>, resets_in: &Option<u64>) -> String {
    match (limit, resets_in) {
        (Some(limit), Some(secs)) => format!(" ({} requests, resets in {}s)", limit, secs),
        (Some(limit), None) => format!(" ({} requests)", limit),
        (None, Some(secs)) => format!(" (resets in {}s)", secs),
        (None, None) => String::new(),
    }
}

/// Where pull requests and their diffs come from.
/// Implementations must answer one request at a time; callers never overlap calls.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Every pull request of the repository, in any state.
    async fn list_pull_requests(&self, repo: &RepoId) -> Result<Vec<PullRequestRef>, PrError>;

    /// Pull requests opened by `author`. Fails with `PrError::SearchOverflow`
    /// when the query matches more than `SEARCH_RESULT_LIMIT` results.
    async fn search_pull_requests(
        &self,
        repo: &RepoId,
        author: &str,
    ) -> Result<Vec<PullRequestRef>, PrError>;

    /// Per-file line changes of a single pull request.
    async fn fetch_changes(&self, repo: &RepoId, number: u64) -> Result<Vec<FileChange>, PrError>;
}

impl RepoId {
    /// Parse `owner/repo` or a GitHub URL such as `https://github.com/owner/repo/pulls`.
    pub fn parse(input: &str) -> Result<RepoId, PrError> {
        let invalid = || PrError::InvalidRepository(input.to_string());

        let segments: Vec<String> = if input.contains("://") {
            let parsed = reqwest::Url::parse(input).map_err(|_| invalid())?;
            if parsed.host_str() != Some("github.com") {
                return Err(invalid());
            }
            parsed
                .path_segments()
                .ok_or_else(invalid)?
                .filter(|segment| !segment.is_empty())
                .take(2)
                .map(str::to_string)
                .collect()
        } else {
            input.trim_matches('/').split('/').map(str::to_string).collect()
        };

        match segments.as_slice() {
            [owner, repo] => {
                let repo = repo.strip_suffix(".git").unwrap_or(repo);
                if !is_valid_name(owner) || !is_valid_name(repo) {
                    return Err(invalid());
                }
                Ok(RepoId {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Rejects empty names and the `.`/`..` path components.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Resolve the ordered set of pull requests to analyze.
///
/// Uses the search endpoint when an author filter is set, the listing endpoint
/// otherwise. Duplicates (PRs shifting between pages mid-traversal) are
/// dropped, keeping the first occurrence.
#[instrument(skip(source, repo, selection), fields(repo = %repo))]
pub async fn enumerate(
    source: &dyn PullRequestSource,
    repo: &RepoId,
    selection: &Selection,
) -> Result<Vec<PullRequestRef>, PrError> {
    let found = match selection.filter_author.as_deref() {
        Some(author) => source.search_pull_requests(repo, author).await?,
        None => source.list_pull_requests(repo).await?,
    };

    let mut seen = HashSet::new();
    let mut pulls: Vec<PullRequestRef> = found
        .into_iter()
        .filter(|pull| seen.insert(pull.number))
        .collect();
    info!(found = pulls.len(), "enumerated pull requests");

    if !selection.include_unmerged {
        let before = pulls.len();
        pulls.retain(|pull| {
            if !pull.merged {
                debug!(pr = pull.number, author = %pull.author, title = %pull.title, "ignoring unmerged PR");
            }
            pull.merged
        });
        info!(ignored = before - pulls.len(), "ignoring unmerged pull requests");
    }

    if !selection.exclude_prs.is_empty() {
        let excluded: HashSet<u64> = selection.exclude_prs.iter().copied().collect();
        let before = pulls.len();
        pulls.retain(|pull| !excluded.contains(&pull.number));
        info!(ignored = before - pulls.len(), "ignoring explicitly excluded pull requests");
    }

    Ok(pulls)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for GitHub.
    #[derive(Default)]
    pub struct MockSource {
        pub pulls: Vec<PullRequestRef>,
        pub changes: HashMap<u64, Vec<FileChange>>,
        pub search_total: Option<u64>,
        pub fetched: Mutex<Vec<u64>>,
    }

    pub fn pull(number: u64, author: &str, merged: bool) -> PullRequestRef {
        PullRequestRef {
            number,
            author: author.to_string(),
            title: format!("PR {}", number),
            merged,
        }
    }

    pub fn change(path: &str, additions: u64, deletions: u64) -> FileChange {
        FileChange {
            path: path.to_string(),
            additions,
            deletions,
        }
    }

    #[async_trait]
    impl PullRequestSource for MockSource {
        async fn list_pull_requests(&self, _repo: &RepoId) -> Result<Vec<PullRequestRef>, PrError> {
            Ok(self.pulls.clone())
        }

        async fn search_pull_requests(
            &self,
            _repo: &RepoId,
            author: &str,
        ) -> Result<Vec<PullRequestRef>, PrError> {
            let matching: Vec<PullRequestRef> = self
                .pulls
                .iter()
                .filter(|pull| pull.author == author)
                .cloned()
                .collect();
            client::check_search_ceiling(self.search_total.unwrap_or(matching.len() as u64))?;
            Ok(matching)
        }

        async fn fetch_changes(&self, _repo: &RepoId, number: u64) -> Result<Vec<FileChange>, PrError> {
            self.fetched.lock().unwrap().push(number);
            self.changes.get(&number).cloned().ok_or_else(|| PrError::NotFound {
                url: format!("mock://pulls/{}", number),
            })
        }
    }
}
