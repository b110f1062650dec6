//! Raw poem file layout: title line, body, author line.

use super::IngestError;

/// One raw poem split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPoem {
    pub title: String,
    /// Lines between title and author, outer blank lines removed.
    pub body: String,
    pub author: String,
}

/// Splits a raw poem blob.
///
/// `\r\n` is normalized to `\n`. The first line must equal `title`; the last
/// non-empty line is the author.
///
/// # Errors
/// - `TitleMismatch` when the first line differs from `title`.
/// - `MissingAuthor` when nothing follows the title line.
pub fn parse_raw_poem(title: &str, blob: &str) -> Result<RawPoem, IngestError> {
    let normalized = blob.replace("\r\n", "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();

    let first = lines.first().copied().unwrap_or_default();
    if first != title {
        return Err(IngestError::TitleMismatch {
            expected: title.to_string(),
            found: first.to_string(),
        });
    }
    lines.remove(0);

    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    let author = lines
        .pop()
        .map(str::trim)
        .ok_or_else(|| IngestError::MissingAuthor {
            title: title.to_string(),
        })?
        .to_string();

    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |index| index + 1);

    Ok(RawPoem {
        title: title.to_string(),
        body: lines[start..end].join("\n"),
        author,
    })
}

#[cfg(test)]
mod tests {
    use super::parse_raw_poem;
    use crate::ingest::IngestError;

    #[test]
    fn splits_title_body_and_author() {
        let raw = "Echo\n\nfirst line\nsecond line\n\nAnon\n";
        let poem = parse_raw_poem("Echo", raw).unwrap();
        assert_eq!(poem.body, "first line\nsecond line");
        assert_eq!(poem.author, "Anon");
    }

    #[test]
    fn windows_line_endings_are_normalized() {
        let poem = parse_raw_poem("Echo", "Echo\r\n\r\nbody\r\n\r\nAnon").unwrap();
        assert_eq!(poem.body, "body");
        assert_eq!(poem.author, "Anon");
    }

    #[test]
    fn title_mismatch_is_fatal() {
        let err = parse_raw_poem("Echo", "Narcissus\n\nbody\n\nAnon").unwrap_err();
        match err {
            IngestError::TitleMismatch { expected, found } => {
                assert_eq!(expected, "Echo");
                assert_eq!(found, "Narcissus");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn title_only_blob_has_no_author() {
        assert!(matches!(
            parse_raw_poem("Echo", "Echo\n\n"),
            Err(IngestError::MissingAuthor { .. })
        ));
    }
}
