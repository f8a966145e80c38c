//! Request Field Codec
//!
//! Decodes the boundary-delimited request body into a field mapping, and
//! encodes a mapping back into the canonical form.
//!
//! # Body Format
//!
//! ```text
//! --<boundary>
//! Content-Disposition: form-data; name="mimetype"
//!
//! application/javascript
//! --<boundary>
//! Content-Disposition: form-data; name="code"
//!
//! 1+1
//! --<boundary>--
//! ```
//!
//! # Decoding Rules
//!
//! - The first line starting with `--` fixes the boundary token; after that,
//!   only lines starting with that token are boundary lines.
//! - A boundary line commits the field being read (if any) and starts a new record.
//! - The line after a `Content-Disposition` header is the separator and is skipped.
//! - Blank lines are skipped everywhere else.
//! - Content lines are concatenated with no delimiter, so multi-line values lose
//!   their line breaks.
//! - A field that is never closed by a boundary line is dropped.
//!
//! Malformed input never fails; broken records are simply missing from the result.

use std::collections::HashMap;

const BOUNDARY_PREFIX: &str = "--";
const DISPOSITION_HEADER: &str = "content-disposition:";

/// Decoded request fields, keyed by field name.
///
/// Unknown keys are carried but ignored by the server. The conventional keys
/// have typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFields {
    fields: HashMap<String, String>,
}

impl RequestFields {
    /// Creates an empty field mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, returning the previous value if the name was taken.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(name.into(), value.into())
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Content-kind selecting the guest adapter.
    pub fn mimetype(&self) -> Option<&str> {
        self.get("mimetype")
    }

    /// Source text to evaluate. Missing code is passed on as an empty string.
    pub fn code(&self) -> &str {
        self.get("code").unwrap_or("")
    }

    /// Whether the evaluated value should be returned. Only the literal
    /// `"TRUE"` enables echo.
    pub fn echo(&self) -> bool {
        self.get("echo") == Some("TRUE")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = RequestFields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

/// Decodes a boundary-delimited body into request fields.
///
/// See the module documentation for the exact rules. This never fails.
///
/// # Example
///
/// ```
/// use polyeval_common::protocol::decode_fields;
///
/// let body = "--xyz\r\n\
///             Content-Disposition: form-data; name=\"code\"\r\n\
///             \r\n\
///             1+1\r\n\
///             --xyz--\r\n";
/// let fields = decode_fields(body);
/// assert_eq!(fields.code(), "1+1");
/// ```
pub fn decode_fields(body: &str) -> RequestFields {
    let mut fields = RequestFields::new();
    let mut boundary: Option<&str> = None;
    let mut name: Option<String> = None;
    let mut value = String::new();
    let mut record_start = false;
    let mut skip_separator = false;

    for raw in body.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        let is_boundary = match boundary {
            Some(token) => line.starts_with(token),
            None if line.starts_with(BOUNDARY_PREFIX) => {
                boundary = Some(line);
                true
            }
            None => false,
        };

        if is_boundary {
            if let Some(name) = name.take() {
                fields.insert(name, std::mem::take(&mut value));
            }
            value.clear();
            record_start = true;
            skip_separator = false;
            continue;
        }

        if skip_separator {
            skip_separator = false;
            continue;
        }

        if record_start && is_disposition_header(line) {
            name = field_name(line);
            record_start = false;
            skip_separator = true;
            continue;
        }

        if line.is_empty() {
            continue;
        }

        record_start = false;
        value.push_str(line);
    }

    fields
}

/// Encodes fields in the canonical boundary format understood by [`decode_fields`].
///
/// Fields are written in name order so the output is deterministic. Values
/// containing line breaks do not survive decoding intact.
pub fn encode_fields(fields: &RequestFields, boundary: &str) -> String {
    let mut entries: Vec<(&str, &str)> = fields.iter().collect();
    entries.sort_unstable_by_key(|(name, _)| *name);

    let mut body = String::new();
    for (name, value) in entries {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

fn is_disposition_header(line: &str) -> bool {
    line.get(..DISPOSITION_HEADER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DISPOSITION_HEADER))
}

/// Pulls the field name out of `Content-Disposition: form-data; name="code"`.
fn field_name(header: &str) -> Option<String> {
    let (_, rest) = header.split_once('=')?;
    let rest = rest.trim_start();
    let name = match rest.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or(quoted),
        None => rest.split(';').next().unwrap_or(rest).trim_end(),
    };
    Some(name.to_string())
}
