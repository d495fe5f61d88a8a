//! Content file codec: a YAML front-matter header followed by the Markdown body.
//!
//! ```text
//! ---
//! id: 4
//! title: Meeting Notes
//! type: note
//! tags:
//! - work
//! date: 2024-05-01T09:30:00Z
//! modified: 2024-05-01T09:30:00Z
//! ---
//! Discuss roadmap
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{ContentKind, ContentObject};

const DELIMITER: &str = "---";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    id: u64,
    title: String,
    #[serde(rename = "type")]
    kind: ContentKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    date: DateTime<Utc>,
    #[serde(default)]
    modified: Option<DateTime<Utc>>,
}

pub fn render(obj: &ContentObject) -> Result<String> {
    let header = Header {
        id: obj.id,
        title: obj.title.clone(),
        kind: obj.kind.clone(),
        tags: obj.tags.iter().cloned().collect(),
        url: obj.url.clone(),
        date: obj.created_at,
        modified: Some(obj.updated_at),
    };
    let yaml = serde_yaml::to_string(&header)
        .map_err(|e| Error::InvalidInput(format!("cannot encode object {}: {}", obj.id, e)))?;
    Ok(format!("{}\n{}{}\n{}", DELIMITER, yaml, DELIMITER, obj.body))
}

/// Parse a content file. `path` is only used for error reporting.
pub fn parse(path: &Path, raw: &str) -> Result<ContentObject> {
    let malformed = |reason: String| Error::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let (yaml, body) = split(raw).ok_or_else(|| malformed("missing front matter".to_string()))?;
    let header: Header = serde_yaml::from_str(yaml).map_err(|e| malformed(e.to_string()))?;
    if header.id == 0 {
        return Err(malformed("id must be positive".to_string()));
    }

    Ok(ContentObject {
        id: header.id,
        title: header.title,
        body: body.to_string(),
        tags: header.tags.into_iter().collect::<BTreeSet<_>>(),
        kind: header.kind,
        url: header.url,
        created_at: header.date,
        updated_at: header.modified.unwrap_or(header.date),
    })
}

/// Split into (yaml header, body). Accepts `\n` and `\r\n` line endings.
fn split(raw: &str) -> Option<(&str, &str)> {
    let rest = raw
        .strip_prefix("---\r\n")
        .or_else(|| raw.strip_prefix("---\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ContentObject {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        ContentObject {
            id: 4,
            title: "Meeting Notes".into(),
            body: "Discuss roadmap\n\n---\n\nnot a delimiter for the header".into(),
            tags: ["work".to_string(), "q3".to_string()].into_iter().collect(),
            kind: ContentKind::Note,
            url: None,
            created_at: date,
            updated_at: date,
        }
    }

    #[test]
    fn test_render_then_parse_preserves_fields() {
        let obj = sample();
        let raw = render(&obj).unwrap();
        assert!(raw.starts_with("---\n"));
        assert!(raw.contains("title: Meeting Notes"));
        let parsed = parse(Path::new("4.md"), &raw).unwrap();
        assert_eq!(parsed, obj);
    }

    #[test]
    fn test_parse_hand_written_bookmark() {
        let raw = "---\r\nid: 9\r\ntitle: Rust book\r\ntype: bookmark\r\nurl: https://doc.rust-lang.org/book/\r\ndate: 2023-01-02T03:04:05Z\r\n---\r\nOwnership chapter";
        let obj = parse(Path::new("9.md"), raw).unwrap();
        assert_eq!(obj.kind, ContentKind::Bookmark);
        assert_eq!(obj.url.as_deref(), Some("https://doc.rust-lang.org/book/"));
        assert_eq!(obj.body, "Ownership chapter");
        assert_eq!(obj.updated_at, obj.created_at);
        assert!(obj.tags.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_header() {
        let err = parse(Path::new("x.md"), "# just markdown").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let err = parse(Path::new("x.md"), "---\nid: 1\ntitle: unterminated\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_parse_rejects_zero_id() {
        let raw = "---\nid: 0\ntitle: t\ntype: note\ndate: 2023-01-02T03:04:05Z\n---\n";
        assert!(parse(Path::new("0.md"), raw).is_err());
    }
}
