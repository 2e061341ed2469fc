use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies the scene document to load.
///
/// Parsed from strings of the form `file:<path>`, `file://<path>`,
/// `inline:<document>` or a bare filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    File(PathBuf),
    /// Document text carried in the locator itself.
    Inline(String),
}

impl SourceLocator {
    pub fn parse(s: &str) -> Self {
        if let Some(src) = s.strip_prefix("inline:") {
            return SourceLocator::Inline(src.to_string());
        }
        let path = s
            .strip_prefix("file://")
            .or_else(|| s.strip_prefix("file:"))
            .unwrap_or(s);
        SourceLocator::File(PathBuf::from(path))
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        SourceLocator::File(path.as_ref().to_path_buf())
    }

    pub fn inline(src: impl Into<String>) -> Self {
        SourceLocator::Inline(src.into())
    }

    /// Name used as the location prefix of diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            SourceLocator::File(path) => path.display().to_string(),
            SourceLocator::Inline(_) => "<inline>".to_string(),
        }
    }
}

impl From<&str> for SourceLocator {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<PathBuf> for SourceLocator {
    fn from(path: PathBuf) -> Self {
        SourceLocator::File(path)
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::File(path) => write!(f, "file:{}", path.display()),
            SourceLocator::Inline(src) => write!(f, "inline:({} bytes)", src.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_prefixes() {
        assert_eq!(SourceLocator::parse("file:a/b.tsn"), SourceLocator::file("a/b.tsn"));
        assert_eq!(SourceLocator::parse("file:///tmp/x.tsn"), SourceLocator::file("/tmp/x.tsn"));
        assert_eq!(SourceLocator::parse("scenes/demo.tsn"), SourceLocator::file("scenes/demo.tsn"));
    }

    #[test]
    fn inline_keeps_text() {
        let loc = SourceLocator::parse("inline:Scene { }");
        assert_eq!(loc, SourceLocator::inline("Scene { }"));
        assert_eq!(loc.display_name(), "<inline>");
    }
}
