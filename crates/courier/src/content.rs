//! Where group recipients and bodies come from.
//!
//! A group draft may name a CSV source for extra recipients and an HTML
//! source for the body. [`ContentResolver`] turns those sources into
//! strings. [`FsContentResolver`] reads local files and refuses links.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::GroupError;

/// Extra recipients for a group, beyond the inline list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvSource {
    /// A CSV file on the local filesystem.
    File(PathBuf),
    /// A URL serving CSV.
    Link(String),
}

/// Where a group's HTML body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    /// The body is given inline.
    Text(String),
    /// An HTML file on the local filesystem.
    File(PathBuf),
    /// A URL serving HTML.
    Link(String),
}

/// Resolves recipient and body sources into their contents.
///
/// Failures are reported as [`GroupError::Content`] and are never
/// retried.
pub trait ContentResolver: Send + Sync + 'static {
    /// Addresses from the first column of every CSV record.
    fn recipients(
        &self,
        source: &CsvSource,
    ) -> impl Future<Output = Result<Vec<String>, GroupError>> + Send;

    /// The HTML body text.
    fn body(&self, source: &BodySource) -> impl Future<Output = Result<String, GroupError>> + Send;
}

/// Reads sources from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsContentResolver;

impl FsContentResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ContentResolver for FsContentResolver {
    async fn recipients(&self, source: &CsvSource) -> Result<Vec<String>, GroupError> {
        match source {
            CsvSource::File(path) => {
                let text = read_file(path).await?;
                Ok(first_column(&text))
            }
            CsvSource::Link(link) => Err(unsupported_link(link)),
        }
    }

    async fn body(&self, source: &BodySource) -> Result<String, GroupError> {
        match source {
            BodySource::Text(text) => Ok(text.clone()),
            BodySource::File(path) => read_file(path).await,
            BodySource::Link(link) => Err(unsupported_link(link)),
        }
    }
}

async fn read_file(path: &Path) -> Result<String, GroupError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GroupError::Content(format!("{}: {e}", path.display())))
}

fn unsupported_link(link: &str) -> GroupError {
    GroupError::Content(format!("fetching remote content is not supported: {link}"))
}

/// Returns the trimmed first field of every non-blank line.
///
/// Handles a double-quoted first field, including `""` escapes.
pub fn first_column(csv: &str) -> Vec<String> {
    csv.lines()
        .filter(|line| !line.trim().is_empty())
        .map(first_field)
        .filter(|field| !field.is_empty())
        .collect()
}

fn first_field(line: &str) -> String {
    let line = line.trim_start();
    let Some(rest) = line.strip_prefix('"') else {
        return line.split(',').next().unwrap_or_default().trim().to_string();
    };

    let mut field = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                field.push('"');
                chars.next();
            } else {
                break;
            }
        } else {
            field.push(c);
        }
    }
    field.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_column_plain() {
        let csv = "a@x.com,Alice\nb@x.com,Bob\n\n  c@x.com \n";
        assert_eq!(first_column(csv), vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[test]
    fn test_first_column_quoted() {
        let csv = "\"d@x.com\",\"Dee, D.\"\r\n\"say \"\"hi\"\"\",x";
        assert_eq!(first_column(csv), vec!["d@x.com", "say \"hi\""]);
    }

    #[tokio::test]
    async fn test_fs_resolver_reads_csv_file() {
        let path = std::env::temp_dir().join(format!("courier-csv-{}.csv", std::process::id()));
        tokio::fs::write(&path, "email,name\na@x.com,A\n").await.unwrap();

        let recipients = FsContentResolver::new()
            .recipients(&CsvSource::File(path.clone()))
            .await
            .unwrap();
        // The header row comes through and is dropped later by the
        // dispatcher's address filter.
        assert_eq!(recipients, vec!["email", "a@x.com"]);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_fs_resolver_missing_file_returns_content_error() {
        let result = FsContentResolver::new()
            .body(&BodySource::File(PathBuf::from("/definitely/not/here.html")))
            .await;
        assert!(matches!(result, Err(GroupError::Content(_))));
    }

    #[tokio::test]
    async fn test_fs_resolver_link_returns_content_error() {
        let result = FsContentResolver::new()
            .recipients(&CsvSource::Link("https://example.com/list.csv".into()))
            .await;
        assert!(matches!(result, Err(GroupError::Content(_))));
    }

    #[tokio::test]
    async fn test_fs_resolver_inline_text_passes_through() {
        let body = FsContentResolver::new()
            .body(&BodySource::Text("<p>hi</p>".into()))
            .await
            .unwrap();
        assert_eq!(body, "<p>hi</p>");
    }
}
