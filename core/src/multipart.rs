//! multipart/form-data encoding for attachment uploads.
//!
//! Nested JSON fields are flattened into bracketed names
//! (`data[followers][0]`), one form field per terminal value, and the file is
//! appended as a single part under the reserved `file` name.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Form field name the file part is sent under.
pub const FILE_FIELD: &str = "file";

/// A file to upload: either a path on disk or contents already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl FileRef {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        FileRef::Path(path.into())
    }

    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        FileRef::Bytes {
            name: name.into(),
            bytes,
        }
    }

    /// Resolve into a form part, reading the file if needed.
    ///
    /// Fails with `Error::Argument` when the path cannot be read.
    pub fn load(&self) -> Result<FilePart> {
        match self {
            FileRef::Bytes { name, bytes } => Ok(FilePart {
                file_name: name.clone(),
                content: bytes.clone(),
            }),
            FileRef::Path(path) => {
                let content = fs::read(path).map_err(|err| {
                    Error::Argument(format!("Unable to open {} for reading: {err}", path.display()))
                })?;
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| FILE_FIELD.to_string());
                Ok(FilePart { file_name, content })
            }
        }
    }
}

/// A file ready to be written into a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Flatten a JSON structure into `(name, value)` form fields.
///
/// Object keys and array indices become bracketed segments after the first
/// one. Empty containers produce no field; `null` becomes an empty string.
pub fn flatten_fields(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(value, None, &mut out);
    out
}

fn flatten_into(value: &Value, prefix: Option<&str>, out: &mut Vec<(String, String)>) {
    let name_for = |key: &str| match prefix {
        Some(prefix) => format!("{prefix}[{key}]"),
        None => key.to_string(),
    };
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(child, Some(&name_for(key)), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, Some(&name_for(&index.to_string())), out);
            }
        }
        scalar => {
            // A bare scalar with no name has nowhere to go.
            if let Some(name) = prefix {
                out.push((name.to_string(), scalar_text(scalar)));
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// An encoded multipart body together with its boundary.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub boundary: String,
    pub bytes: Vec<u8>,
}

impl MultipartBody {
    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Encode `fields` followed by `file` as multipart/form-data.
pub fn encode(fields: &[(String, String)], file: &FilePart) -> MultipartBody {
    let boundary = format!("------------------------{}", Uuid::new_v4().simple());
    let mut bytes = Vec::new();

    for (name, value) in fields {
        bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        bytes.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", quote(name)).as_bytes(),
        );
        bytes.extend_from_slice(value.as_bytes());
        bytes.extend_from_slice(b"\r\n");
    }

    bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    bytes.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{}\"\r\n",
            quote(&file.file_name)
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    bytes.extend_from_slice(&file.content);
    bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    MultipartBody { boundary, bytes }
}

fn quote(text: &str) -> String {
    text.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn arrays_are_flattened_with_indices() {
        let fields = flatten_fields(&json!({"data": {"followers": ["37136", "59083"]}}));
        assert_eq!(
            fields,
            vec![
                ("data[followers][0]".to_string(), "37136".to_string()),
                ("data[followers][1]".to_string(), "59083".to_string()),
            ]
        );
    }

    #[test]
    fn one_field_per_terminal_value() {
        let fields = flatten_fields(&json!({
            "data": {
                "name": "Hello",
                "completed": false,
                "memberships": [{"project": "99", "section": "12"}],
                "notes": null,
                "tags": [],
            }
        }));
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"data[name]"));
        assert!(names.contains(&"data[completed]"));
        assert!(names.contains(&"data[memberships][0][project]"));
        assert!(names.contains(&"data[memberships][0][section]"));
        assert!(names.contains(&"data[notes]"));

        let lookup = |name: &str| fields.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str());
        assert_eq!(lookup("data[completed]"), Some("false"));
        assert_eq!(lookup("data[notes]"), Some(""));
    }

    #[test]
    fn top_level_scalar_produces_nothing() {
        assert!(flatten_fields(&json!("loose")).is_empty());
        assert!(flatten_fields(&json!({})).is_empty());
    }

    #[test]
    fn encoded_body_contains_fields_and_file() {
        let fields = vec![("data[name]".to_string(), "report".to_string())];
        let file = FilePart {
            file_name: "report.txt".to_string(),
            content: b"hello attachment".to_vec(),
        };
        let body = encode(&fields, &file);
        let text = String::from_utf8(body.bytes.clone()).unwrap();

        assert!(body.content_type().starts_with("multipart/form-data; boundary="));
        assert!(text.starts_with(&format!("--{}\r\n", body.boundary)));
        assert!(text.contains("Content-Disposition: form-data; name=\"data[name]\"\r\n\r\nreport\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"report.txt\""));
        assert!(text.contains("hello attachment"));
        assert!(text.ends_with(&format!("--{}--\r\n", body.boundary)));
    }

    #[test]
    fn boundaries_differ_between_bodies() {
        let file = FilePart {
            file_name: "a".to_string(),
            content: Vec::new(),
        };
        assert_ne!(encode(&[], &file).boundary, encode(&[], &file).boundary);
    }

    #[test]
    fn quotes_in_file_names_are_escaped() {
        let file = FilePart {
            file_name: "we\"ird.txt".to_string(),
            content: Vec::new(),
        };
        let text = String::from_utf8(encode(&[], &file).bytes).unwrap();
        assert!(text.contains("filename=\"we%22ird.txt\""));
    }

    #[test]
    fn path_ref_reads_file_and_keeps_name() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"contents").unwrap();
        let part = FileRef::path(tmp.path()).load().unwrap();
        assert_eq!(part.content, b"contents");
        assert_eq!(
            part.file_name,
            tmp.path().file_name().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn missing_path_is_an_argument_error() {
        let err = FileRef::path("/definitely/not/here.pdf").load().unwrap_err();
        match err {
            Error::Argument(message) => {
                assert!(message.starts_with("Unable to open /definitely/not/here.pdf for reading"))
            }
            other => panic!("expected argument error, got {other:?}"),
        }
    }

    #[test]
    fn in_memory_ref_needs_no_disk() {
        let part = FileRef::bytes("notes.md", b"# notes".to_vec()).load().unwrap();
        assert_eq!(part.file_name, "notes.md");
        assert_eq!(part.content, b"# notes");
    }
}
