//! Form body parsing: `application/x-www-form-urlencoded` and
//! `multipart/form-data`.
//!
//! Parsing is invoked lazily by the binder the first time a `form`-sourced
//! field is decoded and the result is cached on the request context.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Maximum number of bytes a single uploaded part may occupy in memory.
pub const MAX_PART_SIZE: usize = 2_621_440; // 2.5 MB

/// An uploaded file extracted from a multipart body.
///
/// The content is reference-counted so binding the same part into several
/// destinations does not copy the bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename supplied by the client.
    pub filename: String,
    /// MIME type of the part, `application/octet-stream` when absent.
    pub content_type: String,
    /// Raw part content.
    pub data: Arc<[u8]>,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Parsed form body: ordered text fields plus uploaded files keyed by part name.
#[derive(Debug, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormData {
    /// First value registered under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values registered under `key`, in body order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.fields
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Uploaded parts registered under `key`.
    pub fn files(&self, key: &str) -> &[UploadedFile] {
        self.files.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some() || !self.files(key).is_empty()
    }
}

/// Parse a form body according to its `Content-Type`.
///
/// Anything that is not `multipart/form-data` is treated as urlencoded,
/// which matches how browsers submit plain forms.
pub fn parse_form(content_type: Option<&str>, body: &[u8]) -> Result<FormData> {
    if let Some(ct) = content_type {
        if ct.starts_with("multipart/form-data") {
            let boundary = extract_boundary(ct).ok_or_else(|| {
                Error::bad_request().with_detail("multipart body without boundary")
            })?;
            return parse_multipart(body, boundary);
        }
    }
    Ok(parse_urlencoded(body))
}

fn parse_urlencoded(body: &[u8]) -> FormData {
    FormData {
        fields: url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        files: HashMap::new(),
    }
}

/// Extract the boundary token from a multipart `Content-Type` value.
pub fn extract_boundary(content_type: &str) -> Option<&str> {
    for part in content_type.split(';') {
        let trimmed = part.trim();
        if let Some(boundary) = trimmed.strip_prefix("boundary=") {
            let boundary = boundary.trim_matches('"');
            if boundary.is_empty() {
                return None;
            }
            return Some(boundary);
        }
    }
    None
}

/// Parse a `multipart/form-data` body.
///
/// Parts carrying a `filename` land in [`FormData::files`]; everything else
/// becomes a text field. Parts larger than [`MAX_PART_SIZE`] fail the whole
/// parse.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<FormData> {
    let mut form = FormData::default();
    let delimiter = format!("--{boundary}");
    let body_str = String::from_utf8_lossy(body);

    for part in body_str.split(delimiter.as_str()) {
        let part = part.trim_start_matches("\r\n").trim_end_matches("\r\n");
        if part.is_empty() || part.starts_with("--") {
            continue;
        }

        let (header_block, content) = match part.find("\r\n\r\n") {
            Some(pos) => (&part[..pos], &part[pos + 4..]),
            None => match part.find("\n\n") {
                Some(pos) => (&part[..pos], &part[pos + 2..]),
                None => continue,
            },
        };

        let mut field_name = None;
        let mut filename = None;
        let mut content_type = "application/octet-stream".to_string();
        for line in header_block.lines() {
            let line = line.trim();
            let lower = line.to_ascii_lowercase();
            if lower.starts_with("content-disposition:") {
                let value = line[line.find(':').map(|i| i + 1).unwrap_or(0)..].trim();
                if let Some(name) = disposition_param(value, "name") {
                    field_name = Some(name);
                }
                if let Some(fname) = disposition_param(value, "filename") {
                    filename = Some(fname);
                }
            } else if lower.starts_with("content-type:") {
                content_type = line[line.find(':').map(|i| i + 1).unwrap_or(0)..]
                    .trim()
                    .to_string();
            }
        }

        let Some(name) = field_name else { continue };
        let content = content.trim_end_matches("\r\n");

        match filename {
            Some(fname) => {
                if fname.is_empty() && content.is_empty() {
                    continue;
                }
                if content.len() > MAX_PART_SIZE {
                    return Err(Error::bad_request()
                        .with_detail(format!("uploaded part {fname:?} exceeds {MAX_PART_SIZE} bytes")));
                }
                form.files.entry(name).or_default().push(UploadedFile {
                    filename: fname,
                    content_type: content_type.clone(),
                    data: Arc::from(content.as_bytes()),
                });
            }
            None => form.fields.push((name, content.to_string())),
        }
    }

    Ok(form)
}

fn disposition_param(header_value: &str, param: &str) -> Option<String> {
    let quoted = format!("{param}=\"");
    if let Some(start) = header_value.find(&quoted) {
        let rest = &header_value[start + quoted.len()..];
        return rest.find('"').map(|end| rest[..end].to_string());
    }
    let bare = format!("{param}=");
    if let Some(start) = header_value.find(&bare) {
        let rest = &header_value[start + bare.len()..];
        let end = rest.find(';').unwrap_or(rest.len());
        let value = rest[..end].trim().trim_matches('"');
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_boundary() {
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=----xyz"),
            Some("----xyz")
        );
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=\"q\""),
            Some("q")
        );
        assert_eq!(extract_boundary("multipart/form-data"), None);
        assert_eq!(extract_boundary("multipart/form-data; boundary="), None);
    }

    #[test]
    fn test_urlencoded_order_and_lookup() {
        let form = parse_urlencoded(b"a=1&b=two&a=3");
        assert_eq!(form.value("a"), Some("1"));
        assert_eq!(form.values("a").collect::<Vec<_>>(), vec!["1", "3"]);
        assert_eq!(form.value("b"), Some("two"));
        assert!(form.has("b"));
        assert!(!form.has("missing"));
    }

    #[test]
    fn test_urlencoded_empty_value_is_present() {
        let form = parse_urlencoded(b"k=");
        assert_eq!(form.value("k"), Some(""));
        assert!(form.has("k"));
    }

    #[test]
    fn test_multipart_mixed() {
        let boundary = "boundary123";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\
             \r\n\
             My Document\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"doc.pdf\"\r\n\
             Content-Type: application/pdf\r\n\
             \r\n\
             %PDF-1.4 fake content\r\n\
             --{boundary}--\r\n"
        );
        let form = parse_multipart(body.as_bytes(), boundary).unwrap();
        assert_eq!(form.value("title"), Some("My Document"));
        let files = form.files("file");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "doc.pdf");
        assert_eq!(files[0].content_type, "application/pdf");
        assert_eq!(&*files[0].data, b"%PDF-1.4 fake content");
    }

    #[test]
    fn test_multipart_repeated_file_field() {
        let boundary = "b";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"files\"; filename=\"a.txt\"\r\n\
             \r\n\
             A\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"files\"; filename=\"b.txt\"\r\n\
             \r\n\
             B\r\n\
             --{boundary}--\r\n"
        );
        let form = parse_multipart(body.as_bytes(), boundary).unwrap();
        assert_eq!(form.files("files").len(), 2);
    }

    #[test]
    fn test_multipart_oversized_part_rejected() {
        let boundary = "b";
        let huge = "X".repeat(MAX_PART_SIZE + 1);
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"f\"; filename=\"big.bin\"\r\n\
             \r\n\
             {huge}\r\n\
             --{boundary}--\r\n"
        );
        assert!(parse_multipart(body.as_bytes(), boundary).is_err());
    }

    #[test]
    fn test_multipart_part_without_disposition_skipped() {
        let boundary = "b";
        let body = format!(
            "--{boundary}\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             orphan\r\n\
             --{boundary}--\r\n"
        );
        let form = parse_multipart(body.as_bytes(), boundary).unwrap();
        assert!(form.value("orphan").is_none());
    }
}
