use std::error::Error;
use std::fmt;

/// Structured identifier for a build target: an optional repository, a
/// package path and a target name (`@repo//pkg/sub:name`).
///
/// Labels are the external names of graph vertices; everything internal is
/// keyed by [`crate::VertexId`] or a 128-bit label hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    repo: Option<String>,
    package: String,
    name: String,
}

impl Label {
    pub fn new(repo: Option<String>, package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repo,
            package: package.into(),
            name: name.into(),
        }
    }

    /// Parses `[@repo]//package[:name]`.
    ///
    /// When the name part is omitted it defaults to the last package
    /// segment, matching build-tool shorthand (`//foo/bar` == `//foo/bar:bar`).
    pub fn parse(input: &str) -> Result<Self, LabelParseError> {
        let (repo, rest) = match input.strip_prefix('@') {
            Some(rest) => {
                let idx = rest
                    .find("//")
                    .ok_or_else(|| LabelParseError::new(input, "missing `//` separator"))?;
                (Some(rest[..idx].to_string()), &rest[idx..])
            }
            None => (None, input),
        };

        let rest = rest
            .strip_prefix("//")
            .ok_or_else(|| LabelParseError::new(input, "expected `//` prefix"))?;

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => {
                if name.is_empty() {
                    return Err(LabelParseError::new(input, "empty target name"));
                }
                (package.to_string(), name.to_string())
            }
            None => {
                let name = rest
                    .rsplit('/')
                    .next()
                    .filter(|segment| !segment.is_empty())
                    .ok_or_else(|| LabelParseError::new(input, "cannot derive target name"))?;
                (rest.to_string(), name.to_string())
            }
        };

        Ok(Self {
            repo,
            package,
            name,
        })
    }

    pub fn repo(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shorthand display that drops a target name equal to the last package
    /// segment (`//foo/bar:bar` → `//foo/bar`).
    pub fn to_short_string(&self) -> String {
        let last_segment = self.package.rsplit('/').next().unwrap_or("");
        if !self.package.is_empty() && last_segment == self.name {
            match &self.repo {
                Some(repo) => format!("@{repo}//{}", self.package),
                None => format!("//{}", self.package),
            }
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(repo) = &self.repo {
            write!(f, "@{repo}")?;
        }
        write!(f, "//{}:{}", self.package, self.name)
    }
}

/// Error returned by [`Label::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelParseError {
    input: String,
    reason: &'static str,
}

impl LabelParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

impl fmt::Display for LabelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid label {:?}: {}", self.input, self.reason)
    }
}

impl Error for LabelParseError {}
