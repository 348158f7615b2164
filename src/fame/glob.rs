use globset::{Glob, GlobMatcher};

use super::FameError;

/// Globs applied unless `--disable-default-exclude-globs` is given.
pub const DEFAULT_EXCLUDE_GLOBS: &[&str] = &["package-lock.json", "*min.js", "*min.css"];

/// A single path pattern, matched component by component from the right.
///
/// `*min.js` matches `static/app.min.js`; `/docs/*.md` only matches
/// `docs/<file>.md` at the repository root. `**` stands for exactly one
/// component here, it is not a recursive wildcard.
#[derive(Debug, Clone)]
struct PathPattern {
    raw: String,
    anchored: bool,
    components: Vec<GlobMatcher>,
}

impl PathPattern {
    fn new(raw: &str) -> Result<Self, FameError> {
        let anchored = raw.starts_with('/');
        let components = split_components(raw)
            .map(|part| {
                Glob::new(part)
                    .map(|glob| glob.compile_matcher())
                    .map_err(|source| FameError::InvalidGlob {
                        pattern: raw.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if components.is_empty() {
            return Err(FameError::EmptyGlob);
        }

        Ok(Self {
            raw: raw.to_string(),
            anchored,
            components,
        })
    }

    fn matches(&self, path_parts: &[&str]) -> bool {
        if self.anchored && path_parts.len() != self.components.len() {
            return false;
        }
        if path_parts.len() < self.components.len() {
            return false;
        }
        path_parts
            .iter()
            .rev()
            .zip(self.components.iter().rev())
            .all(|(part, matcher)| matcher.is_match(part))
    }
}

fn split_components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
}

/// The set of globs whose matching files are left out of the totals.
#[derive(Debug, Clone, Default)]
pub struct ExcludeGlobs {
    patterns: Vec<PathPattern>,
}

impl ExcludeGlobs {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, FameError> {
        let patterns = patterns
            .iter()
            .map(|pattern| PathPattern::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// The first pattern matching `path`, if any.
    pub fn matching(&self, path: &str) -> Option<&str> {
        let path = path.trim_matches('"');
        let parts: Vec<&str> = split_components(path).collect();
        self.patterns
            .iter()
            .find(|pattern| pattern.matches(&parts))
            .map(|pattern| pattern.raw.as_str())
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.raw.as_str()).collect()
    }
}
