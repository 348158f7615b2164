pub mod glob;
pub mod stats;

pub use glob::{ExcludeGlobs, DEFAULT_EXCLUDE_GLOBS};
pub use stats::{AuthorTotals, ChangeStats};

use thiserror::Error;
use tracing::{debug, debug_span, info, instrument, Instrument};

use crate::pr::{PrError, PullRequestRef, PullRequestSource, RepoId};

#[derive(Debug, Error)]
pub enum FameError {
    #[error("Invalid exclude glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Exclude globs must contain at least one path component")]
    EmptyGlob,

    #[error(transparent)]
    Fetch(#[from] PrError),
}

/// Fetch every pull request's changes, one request at a time, and attribute
/// them to the PR author. Any failed fetch aborts the whole run.
#[instrument(skip_all, fields(repo = %repo, pulls = pulls.len()))]
pub async fn collect(
    source: &dyn PullRequestSource,
    repo: &RepoId,
    pulls: &[PullRequestRef],
    globs: &ExcludeGlobs,
) -> Result<AuthorTotals, FameError> {
    info!("getting changes for pull requests");
    let mut totals = AuthorTotals::default();

    for (index, pull) in pulls.iter().enumerate() {
        let span = debug_span!("pull_request", pr = pull.number, author = %pull.author);
        let files = source
            .fetch_changes(repo, pull.number)
            .instrument(span.clone())
            .await?;

        span.in_scope(|| {
            debug!(title = %pull.title, files = files.len(), progress = index + 1, "checking PR");
            let ignored = totals.add_pull_request(pull, &files, globs);
            if ignored > 0 {
                debug!(ignored, "files matched exclude globs");
            }
        });
    }

    info!(authors = totals.len(), "aggregation complete");
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::testing::{change, pull, MockSource};
    use std::collections::HashMap;

    fn repo() -> RepoId {
        RepoId::parse("org/repo").unwrap()
    }

    fn source() -> MockSource {
        let mut changes = HashMap::new();
        changes.insert(1, vec![change("src/a.rs", 10, 5), change("dist/app.min.js", 900, 0)]);
        changes.insert(2, vec![change("src/b.rs", 7, 1)]);
        changes.insert(3, vec![change("src/a.rs", 2, 2)]);
        MockSource {
            pulls: vec![pull(1, "alice", true), pull(2, "bob", true), pull(3, "alice", true)],
            changes,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_collect_sums_per_author() {
        let source = source();
        let globs = ExcludeGlobs::new(DEFAULT_EXCLUDE_GLOBS).unwrap();
        let totals = collect(&source, &repo(), &source.pulls, &globs).await.unwrap();

        let alice = totals.get("alice").unwrap();
        assert_eq!(alice.pull_requests, 2);
        assert_eq!(alice.totals, ChangeStats { additions: 12, deletions: 7 });
        let bob = totals.get("bob").unwrap();
        assert_eq!(bob.totals, ChangeStats { additions: 7, deletions: 1 });
    }

    #[tokio::test]
    async fn test_collect_fetches_each_pr_once_in_order() {
        let source = source();
        collect(&source, &repo(), &source.pulls, &ExcludeGlobs::default())
            .await
            .unwrap();
        assert_eq!(*source.fetched.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_excluded_prs_never_contribute() {
        let source = source();
        let selection = crate::pr::Selection {
            exclude_prs: vec![2],
            ..Default::default()
        };
        let pulls = crate::pr::enumerate(&source, &repo(), &selection).await.unwrap();
        let totals = collect(&source, &repo(), &pulls, &ExcludeGlobs::default())
            .await
            .unwrap();

        assert!(totals.get("bob").is_none());
        assert!(!source.fetched.lock().unwrap().contains(&2));
    }

    #[tokio::test]
    async fn test_fetch_error_aborts() {
        let mut source = source();
        source.pulls.push(pull(4, "dave", true));
        let err = collect(&source, &repo(), &source.pulls, &ExcludeGlobs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FameError::Fetch(PrError::NotFound { .. })));
    }
}
