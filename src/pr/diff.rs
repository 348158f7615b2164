use super::types::FileChange;
use super::PrError;

/// Parse a unified diff (as returned by GitHub's diff media type) into
/// per-file line counts.
///
/// Each file section starts with:
///   diff --git a/{path} b/{path}
///
/// The path is taken from `+++ b/{path}`, falling back to `--- a/{path}` for
/// deleted files and to the `diff --git` header for binary files and pure
/// renames. `rename to {path}` overrides all of them.
///
/// Hunks start with: @@ -{old_start},{old_count} +{new_start},{new_count} @@
/// and body lines are consumed by those counts, so an added line whose content
/// starts with "++" is still counted as an addition.
pub fn parse_diff(raw_diff: &str) -> Result<Vec<FileChange>, PrError> {
    if raw_diff.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut current_file: Option<FileChange> = None;
    let mut old_remaining: u64 = 0;
    let mut new_remaining: u64 = 0;

    for line in raw_diff.lines() {
        if old_remaining > 0 || new_remaining > 0 {
            if let Some(file) = current_file.as_mut() {
                match line.as_bytes().first() {
                    Some(b'+') => {
                        file.additions += 1;
                        new_remaining = new_remaining.saturating_sub(1);
                        continue;
                    }
                    Some(b'-') => {
                        file.deletions += 1;
                        old_remaining = old_remaining.saturating_sub(1);
                        continue;
                    }
                    // Blank context lines sometimes lose their leading space.
                    Some(b' ') | None => {
                        old_remaining = old_remaining.saturating_sub(1);
                        new_remaining = new_remaining.saturating_sub(1);
                        continue;
                    }
                    Some(b'\\') => continue,
                    _ => {
                        old_remaining = 0;
                        new_remaining = 0;
                    }
                }
            }
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(file) = current_file.take() {
                files.push(file);
            }
            let path = header_path(rest).ok_or_else(|| {
                PrError::DiffParse(format!("Missing path in diff header: {line}"))
            })?;
            current_file = Some(FileChange {
                path,
                additions: 0,
                deletions: 0,
            });
            continue;
        }

        let Some(file) = current_file.as_mut() else {
            continue;
        };

        if line.starts_with("@@") {
            let (old_count, new_count) = parse_hunk_header(line)?;
            old_remaining = old_count;
            new_remaining = new_count;
        } else if let Some(path) = line.strip_prefix("--- ") {
            if path.trim() != "/dev/null" {
                file.path = clean_path(path, "a/");
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            if path.trim() != "/dev/null" {
                file.path = clean_path(path, "b/");
            }
        } else if let Some(path) = line.strip_prefix("rename to ") {
            file.path = clean_path(path, "");
        }
    }

    if let Some(file) = current_file.take() {
        files.push(file);
    }
    Ok(files)
}

/// Extract the post-image path from the remainder of a `diff --git` line.
fn header_path(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let b_part = match rest.rfind(" \"b/").or_else(|| rest.rfind(" b/")) {
        Some(idx) => &rest[idx + 1..],
        None => rest.split_whitespace().last()?,
    };
    Some(clean_path(b_part, "b/"))
}

fn clean_path(raw: &str, prefix: &str) -> String {
    let raw = raw.trim().trim_matches('"');
    raw.strip_prefix(prefix).unwrap_or(raw).to_string()
}

/// Returns the (old_count, new_count) pair of a hunk header.
fn parse_hunk_header(line: &str) -> Result<(u64, u64), PrError> {
    let header = line
        .trim()
        .strip_prefix("@@")
        .ok_or_else(|| PrError::DiffParse("Invalid hunk header".to_string()))?;
    let header = match header.split_once("@@") {
        Some((ranges, _section)) => ranges,
        None => header,
    };
    let mut parts = header.split_whitespace();
    let old_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing old range".to_string()))?;
    let new_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing new range".to_string()))?;

    let old_count = parse_range_count(old_part, '-')?;
    let new_count = parse_range_count(new_part, '+')?;
    Ok((old_count, new_count))
}

fn parse_range_count(part: &str, prefix: char) -> Result<u64, PrError> {
    let range = part
        .strip_prefix(prefix)
        .ok_or_else(|| PrError::DiffParse("Invalid range prefix".to_string()))?;
    let (start_str, count_str) = match range.split_once(',') {
        Some((start, count)) => (start, count),
        None => (range, "1"),
    };
    start_str
        .parse::<u64>()
        .map_err(|_| PrError::DiffParse(format!("Invalid range start in {}", part)))?;
    count_str
        .parse::<u64>()
        .map_err(|_| PrError::DiffParse(format!("Invalid range count in {}", part)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_DIFF: &str = r#"diff --git a/src/main.rs b/src/main.rs
index abc1234..def5678 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,3 +1,4 @@
 fn main() {
-    println!("old");
+    println!("new");
+    // Added a comment
 }
"#;

    #[test]
    fn test_parse_single_file_diff() {
        let files = parse_diff(SAMPLE_DIFF).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/main.rs");
        assert_eq!(files[0].additions, 2);
        assert_eq!(files[0].deletions, 1);
    }

    #[test]
    fn test_parse_new_file_diff() {
        let diff = r#"diff --git a/new_file.txt b/new_file.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new_file.txt
@@ -0,0 +1,2 @@
+hello
+world
"#;
        let files = parse_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "new_file.txt");
        assert_eq!(files[0].additions, 2);
        assert_eq!(files[0].deletions, 0);
    }

    #[test]
    fn test_parse_deleted_file_keeps_old_path() {
        let diff = r#"diff --git a/old_file.txt b/old_file.txt
deleted file mode 100644
index e69de29..0000000
--- a/old_file.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-hello
-world
"#;
        let files = parse_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "old_file.txt");
        assert_eq!(files[0].deletions, 2);
    }

    #[test]
    fn test_lines_that_look_like_headers_are_counted() {
        let diff = r#"diff --git a/notes.md b/notes.md
--- a/notes.md
+++ b/notes.md
@@ -1,2 +1,2 @@
--- old heading
+++ new heading
 unchanged
"#;
        let files = parse_diff(diff).unwrap();
        assert_eq!(files[0].additions, 1);
        assert_eq!(files[0].deletions, 1);
    }

    #[test]
    fn test_pure_rename_and_binary() {
        let diff = r#"diff --git a/docs/old.md b/docs/new.md
similarity index 100%
rename from docs/old.md
rename to docs/new.md
diff --git a/logo.png b/logo.png
index 1111111..2222222 100644
Binary files a/logo.png and b/logo.png differ
"#;
        let files = parse_diff(diff).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "docs/new.md");
        assert_eq!((files[0].additions, files[0].deletions), (0, 0));
        assert_eq!(files[1].path, "logo.png");
    }

    #[test]
    fn test_multiple_hunks_and_no_newline_marker() {
        let diff = r#"diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1 +1 @@
-one
+uno
\ No newline at end of file
@@ -10,2 +10,3 @@ fn section()
 ten
+ten and a half
 eleven
"#;
        let files = parse_diff(diff).unwrap();
        assert_eq!(files[0].additions, 2);
        assert_eq!(files[0].deletions, 1);
    }

    #[test]
    fn test_path_with_spaces() {
        let diff = "diff --git \"a/my dir/file.txt\" \"b/my dir/file.txt\"\n\
                    --- \"a/my dir/file.txt\"\n\
                    +++ \"b/my dir/file.txt\"\n\
                    @@ -0,0 +1 @@\n\
                    +x\n";
        let files = parse_diff(diff).unwrap();
        assert_eq!(files[0].path, "my dir/file.txt");
        assert_eq!(files[0].additions, 1);
    }

    #[test]
    fn test_invalid_hunk_header() {
        let diff = "diff --git a/x b/x\n@@ garbage @@\n";
        assert!(parse_diff(diff).is_err());
    }

    #[test]
    fn test_parse_fixture() {
        let files = parse_diff(include_str!("../../tests/fixtures/sample_pr.diff")).unwrap();
        let counts: Vec<(&str, u64, u64)> = files
            .iter()
            .map(|f| (f.path.as_str(), f.additions, f.deletions))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("src/auth/login.rs", 4, 3),
                ("web/package-lock.json", 2, 1),
                ("src/oauth.rs", 5, 0),
                ("docs/legacy.md", 0, 2),
            ]
        );
    }

    #[test]
    fn test_parse_empty_diff() {
        let files = parse_diff("").unwrap();
        assert!(files.is_empty());
    }
}
