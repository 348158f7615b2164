use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::pr::{FileChange, PullRequestRef};

use tracing::debug;

use super::glob::ExcludeGlobs;

/// Added and deleted line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeStats {
    pub additions: u64,
    pub deletions: u64,
}

impl ChangeStats {
    pub fn total(&self) -> u64 {
        self.additions + self.deletions
    }

    fn add(&mut self, additions: u64, deletions: u64) {
        self.additions += additions;
        self.deletions += deletions;
    }

    /// Ranking order: total changes, then additions.
    pub fn rank(&self, other: &Self) -> Ordering {
        (self.total(), self.additions).cmp(&(other.total(), other.additions))
    }
}

impl fmt::Display for ChangeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(+{}, -{})", self.additions, self.deletions)
    }
}

/// Everything attributed to one PR author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorStats {
    pub pull_requests: u64,
    pub totals: ChangeStats,
    pub files: BTreeMap<String, ChangeStats>,
}

impl AuthorStats {
    #[cfg(test)]
    fn merge(&mut self, other: &AuthorStats) {
        self.pull_requests += other.pull_requests;
        self.totals.add(other.totals.additions, other.totals.deletions);
        for (path, stats) in &other.files {
            self.files
                .entry(path.clone())
                .or_default()
                .add(stats.additions, stats.deletions);
        }
    }
}

/// Per-author accumulator. Only ever grows; the result does not depend on the
/// order in which pull requests are added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorTotals {
    authors: BTreeMap<String, AuthorStats>,
}

impl AuthorTotals {
    /// Count `pull` for its author and add every file not matched by `globs`.
    /// Returns the number of files left out.
    pub fn add_pull_request(
        &mut self,
        pull: &PullRequestRef,
        files: &[FileChange],
        globs: &ExcludeGlobs,
    ) -> usize {
        let author = self.authors.entry(pull.author.clone()).or_default();
        author.pull_requests += 1;

        let mut ignored = 0;
        for file in files {
            if let Some(pattern) = globs.matching(&file.path) {
                debug!(path = %file.path, pattern, additions = file.additions, deletions = file.deletions, "ignoring file");
                ignored += 1;
                continue;
            }
            debug!(path = %file.path, additions = file.additions, deletions = file.deletions, "counting file");
            author.totals.add(file.additions, file.deletions);
            author
                .files
                .entry(file.path.clone())
                .or_default()
                .add(file.additions, file.deletions);
        }
        ignored
    }

    /// Fold another accumulator into this one.
    #[cfg(test)]
    pub fn merge(&mut self, other: &AuthorTotals) {
        for (login, stats) in &other.authors {
            self.authors.entry(login.clone()).or_default().merge(stats);
        }
    }

    pub fn get(&self, login: &str) -> Option<&AuthorStats> {
        self.authors.get(login)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AuthorStats)> {
        self.authors.iter().map(|(login, stats)| (login.as_str(), stats))
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fame::glob::DEFAULT_EXCLUDE_GLOBS;
    use crate::pr::testing::{change, pull};

    fn sample() -> Vec<(PullRequestRef, Vec<FileChange>)> {
        vec![
            (
                pull(1, "alice", true),
                vec![change("src/lib.rs", 10, 2), change("package-lock.json", 500, 400)],
            ),
            (pull(2, "bob", true), vec![change("src/lib.rs", 3, 3)]),
            (
                pull(3, "alice", true),
                vec![change("src/lib.rs", 1, 0), change("README.md", 4, 1)],
            ),
        ]
    }

    fn aggregate<'a>(
        items: impl IntoIterator<Item = &'a (PullRequestRef, Vec<FileChange>)>,
        globs: &ExcludeGlobs,
    ) -> AuthorTotals {
        let mut totals = AuthorTotals::default();
        for (pull, files) in items {
            totals.add_pull_request(pull, files, globs);
        }
        totals
    }

    #[test]
    fn test_totals_match_hand_computed_sums() {
        let globs = ExcludeGlobs::new(DEFAULT_EXCLUDE_GLOBS).unwrap();
        let totals = aggregate(&sample(), &globs);

        let alice = totals.get("alice").unwrap();
        assert_eq!(alice.pull_requests, 2);
        assert_eq!(alice.totals, ChangeStats { additions: 15, deletions: 3 });
        assert_eq!(alice.files["src/lib.rs"], ChangeStats { additions: 11, deletions: 2 });
        assert!(!alice.files.contains_key("package-lock.json"));

        let bob = totals.get("bob").unwrap();
        assert_eq!(bob.pull_requests, 1);
        assert_eq!(bob.totals.total(), 6);
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let globs = ExcludeGlobs::new(DEFAULT_EXCLUDE_GLOBS).unwrap();
        let items = sample();
        let forward = aggregate(&items, &globs);
        let backward = aggregate(items.iter().rev(), &globs);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let globs = ExcludeGlobs::default();
        let items = sample();
        let whole = aggregate(&items, &globs);

        let mut left = aggregate(&items[..1], &globs);
        let right = aggregate(&items[1..], &globs);
        left.merge(&right);
        assert_eq!(left, whole);
    }

    #[test]
    fn test_fully_excluded_pr_still_counts() {
        let globs = ExcludeGlobs::new(DEFAULT_EXCLUDE_GLOBS).unwrap();
        let mut totals = AuthorTotals::default();
        let ignored = totals.add_pull_request(
            &pull(9, "carol", true),
            &[change("package-lock.json", 20, 20)],
            &globs,
        );
        assert_eq!(ignored, 1);
        let carol = totals.get("carol").unwrap();
        assert_eq!(carol.pull_requests, 1);
        assert_eq!(carol.totals, ChangeStats::default());
        assert!(carol.files.is_empty());
    }

    #[test]
    fn test_change_stats_display_and_rank() {
        let small = ChangeStats { additions: 1, deletions: 5 };
        let large = ChangeStats { additions: 4, deletions: 2 };
        assert_eq!(small.to_string(), "(+1, -5)");
        assert_eq!(small.rank(&large), Ordering::Less);
        assert_eq!(large.rank(&small), Ordering::Greater);
    }
}
