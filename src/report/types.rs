use crate::fame::ChangeStats;

/// Number of files listed per author unless verbose output is requested.
pub const TOP_FILES: usize = 5;

/// One file's share of an author's changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub path: String,
    pub changes: ChangeStats,
}

/// One author's line in the report.
#[derive(Debug, Clone)]
pub struct AuthorSummary {
    /// GitHub login
    pub login: String,
    /// Pull requests counted for this author
    pub pull_requests: u64,
    /// Lines added and deleted across all counted files
    pub totals: ChangeStats,
    /// Files ranked by total changes, largest first
    pub files: Vec<FileSummary>,
}

impl AuthorSummary {
    /// Average (additions, deletions) per pull request.
    pub fn average_per_pr(&self) -> (f64, f64) {
        if self.pull_requests == 0 {
            return (0.0, 0.0);
        }
        let count = self.pull_requests as f64;
        (
            self.totals.additions as f64 / count,
            self.totals.deletions as f64 / count,
        )
    }

    /// Files to print: all of them when verbose, the top few otherwise.
    pub fn shown_files(&self, verbose: bool) -> &[FileSummary] {
        if verbose {
            &self.files
        } else {
            &self.files[..self.files.len().min(TOP_FILES)]
        }
    }
}

/// Complete fame report for one repository.
#[derive(Debug)]
pub struct Report {
    /// `owner/repo`
    pub repository: String,
    /// Pull requests whose changes were fetched
    pub pull_requests: usize,
    /// Globs whose files were left out
    pub exclude_globs: Vec<String>,
    /// Authors ranked by total changes, largest first
    pub authors: Vec<AuthorSummary>,
}
