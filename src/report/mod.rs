pub mod types;

pub use types::{AuthorSummary, FileSummary, Report};

use crate::fame::{AuthorTotals, ChangeStats, ExcludeGlobs};
use crate::pr::RepoId;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a ranked Report from the aggregated totals.
///
/// Authors are ordered by total changes, then additions, then PR count, all
/// descending; remaining ties fall back to the login so output is stable.
pub fn build(
    totals: &AuthorTotals,
    repo: &RepoId,
    pull_requests: usize,
    globs: &ExcludeGlobs,
) -> Report {
    let mut authors: Vec<AuthorSummary> = totals
        .iter()
        .map(|(login, stats)| {
            let mut files: Vec<FileSummary> = stats
                .files
                .iter()
                .map(|(path, changes)| FileSummary {
                    path: path.clone(),
                    changes: *changes,
                })
                .collect();
            files.sort_by(|a, b| b.changes.rank(&a.changes).then_with(|| a.path.cmp(&b.path)));

            AuthorSummary {
                login: login.to_string(),
                pull_requests: stats.pull_requests,
                totals: stats.totals,
                files,
            }
        })
        .collect();

    authors.sort_by(|a, b| {
        b.totals
            .rank(&a.totals)
            .then_with(|| b.pull_requests.cmp(&a.pull_requests))
            .then_with(|| a.login.cmp(&b.login))
    });

    Report {
        repository: repo.to_string(),
        pull_requests,
        exclude_globs: globs.patterns().into_iter().map(str::to_string).collect(),
        authors,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(repo = %report.repository, authors = report.authors.len()))]
pub fn output(report: &Report, output_path: Option<&Path>, verbose: bool) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report, verbose);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path, verbose)
        }
    }
}

/// Format and print the report to the terminal with colors:
///
/// alice: 12 PRs. Total changes: (+320, -45). Average per PR: (+26.7, -3.8)
/// Top 5 files changed (out of 9):
///     src/auth.rs (+120, -10)
fn print_terminal_report(report: &Report, verbose: bool) {
    println!();
    println!(
        "═══ {} ═══ {} pull requests analyzed",
        report.repository.bold(),
        report.pull_requests
    );
    if !report.exclude_globs.is_empty() {
        println!("Excluded globs: {}", report.exclude_globs.join(", "));
    }
    println!();

    if report.authors.is_empty() {
        println!("  No pull requests matched.");
        println!();
        return;
    }

    for author in &report.authors {
        let (avg_add, avg_del) = author.average_per_pr();
        println!(
            "{}: {} PRs. Total changes: {}. Average per PR: (+{:.1}, -{:.1})",
            author.login.bold(),
            author.pull_requests,
            colorize_changes(author.totals),
            avg_add,
            avg_del
        );

        if verbose {
            println!("Files changed:");
        } else {
            println!(
                "Top {} files changed (out of {}):",
                types::TOP_FILES,
                author.files.len()
            );
        }
        for file in author.shown_files(verbose) {
            println!("    {} {}", file.path, colorize_changes(file.changes));
        }
        println!();
    }
}

/// Write the report as a markdown file.
///
/// # Fame for org/repo
/// ## alice
/// **PRs:** 12 | **Total:** +320 -45 | **Average per PR:** +26.7 -3.8
/// - `src/auth.rs` +120 -10
fn write_markdown_report(report: &Report, path: &Path, verbose: bool) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# Fame for {}\n\n", report.repository));
    md.push_str(&format!(
        "**Pull requests analyzed:** {}\n\n",
        report.pull_requests
    ));
    if !report.exclude_globs.is_empty() {
        let globs: Vec<String> = report
            .exclude_globs
            .iter()
            .map(|g| format!("`{}`", g))
            .collect();
        md.push_str(&format!("**Excluded globs:** {}\n\n", globs.join(", ")));
    }

    if report.authors.is_empty() {
        md.push_str("No pull requests matched.\n");
    }

    for author in &report.authors {
        let (avg_add, avg_del) = author.average_per_pr();
        md.push_str(&format!("## {}\n\n", author.login));
        md.push_str(&format!(
            "**PRs:** {} | **Total:** +{} -{} | **Average per PR:** +{:.1} -{:.1}\n\n",
            author.pull_requests,
            author.totals.additions,
            author.totals.deletions,
            avg_add,
            avg_del
        ));
        let shown = author.shown_files(verbose);
        if shown.is_empty() {
            md.push_str("No counted files.\n\n");
            continue;
        }
        for file in shown {
            md.push_str(&format!(
                "- `{}` +{} -{}\n",
                file.path, file.changes.additions, file.changes.deletions
            ));
        }
        if shown.len() < author.files.len() {
            md.push_str(&format!(
                "- ... {} more files\n",
                author.files.len() - shown.len()
            ));
        }
        md.push('\n');
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn colorize_changes(changes: ChangeStats) -> String {
    format!(
        "({}, {})",
        format!("+{}", changes.additions).green(),
        format!("-{}", changes.deletions).red()
    )
}
