//! Remote manifest decoding.
//!
//! The manifest is a small JSON document with at least two string fields,
//! `version` and `firmware_url`. Unknown fields are ignored. Field values are
//! copied into bounded storage; an over-length value is a parse error, never
//! a silent truncation.

use std::fmt;

use serde_json::Value;

/// Maximum accepted length of a version string, in bytes.
pub const MAX_VERSION_LEN: usize = 32;

/// Maximum accepted length of a firmware URL, in bytes.
pub const MAX_URL_LEN: usize = 256;

/// One fetched-and-decoded manifest. Built fresh on every check cycle and
/// discarded once the decision is made; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
    pub firmware_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestError {
    /// Body is not a JSON object.
    MalformedDocument,
    /// Required field absent or empty.
    MissingField(&'static str),
    /// Required field present but not a string.
    WrongFieldType(&'static str),
    /// Field value exceeds its bounded storage.
    FieldTooLong(&'static str),
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDocument => write!(f, "manifest is not a JSON object"),
            Self::MissingField(name) => write!(f, "manifest field '{}' missing or empty", name),
            Self::WrongFieldType(name) => write!(f, "manifest field '{}' is not a string", name),
            Self::FieldTooLong(name) => {
                write!(f, "manifest field '{}' exceeds its maximum length", name)
            }
        }
    }
}

impl std::error::Error for ManifestError {}

fn string_field(root: &Value, name: &'static str, max_len: usize) -> Result<String, ManifestError> {
    let value = match root.get(name) {
        Some(Value::String(s)) => s,
        Some(_) => return Err(ManifestError::WrongFieldType(name)),
        None => return Err(ManifestError::MissingField(name)),
    };
    if value.is_empty() {
        return Err(ManifestError::MissingField(name));
    }
    if value.len() > max_len {
        return Err(ManifestError::FieldTooLong(name));
    }
    Ok(value.clone())
}

/// Decode a fetched manifest body.
pub fn parse_manifest(body: &[u8]) -> Result<Manifest, ManifestError> {
    let root: Value =
        serde_json::from_slice(body).map_err(|_| ManifestError::MalformedDocument)?;
    if !root.is_object() {
        return Err(ManifestError::MalformedDocument);
    }

    Ok(Manifest {
        version: string_field(&root, "version", MAX_VERSION_LEN)?,
        firmware_url: string_field(&root, "firmware_url", MAX_URL_LEN)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_manifest() {
        let body = br#"{"version":"1.0.3","firmware_url":"https://example/fw.bin"}"#;
        let manifest = parse_manifest(body).unwrap();
        assert_eq!(manifest.version, "1.0.3");
        assert_eq!(manifest.firmware_url, "https://example/fw.bin");
    }

    #[test]
    fn ignores_unknown_fields() {
        let body = br#"{"version":"2.1.0","firmware_url":"http://h/fw.bin","sha256":"ab","notes":"x"}"#;
        let manifest = parse_manifest(body).unwrap();
        assert_eq!(manifest.version, "2.1.0");
    }

    #[test]
    fn rejects_truncated_document() {
        let body = br#"{"version":"1.0.3","firmware_url":"https://exa"#;
        assert_eq!(parse_manifest(body), Err(ManifestError::MalformedDocument));
    }

    #[test]
    fn rejects_non_object_document() {
        assert_eq!(parse_manifest(b"[1,2,3]"), Err(ManifestError::MalformedDocument));
        assert_eq!(parse_manifest(b"\"1.0.3\""), Err(ManifestError::MalformedDocument));
    }

    #[test]
    fn rejects_missing_version() {
        let body = br#"{"firmware_url":"https://example/fw.bin"}"#;
        assert_eq!(parse_manifest(body), Err(ManifestError::MissingField("version")));
    }

    #[test]
    fn rejects_missing_url() {
        let body = br#"{"version":"1.0.3"}"#;
        assert_eq!(parse_manifest(body), Err(ManifestError::MissingField("firmware_url")));
    }

    #[test]
    fn rejects_empty_fields_as_missing() {
        let body = br#"{"version":"","firmware_url":"https://example/fw.bin"}"#;
        assert_eq!(parse_manifest(body), Err(ManifestError::MissingField("version")));
    }

    #[test]
    fn rejects_non_string_version() {
        let body = br#"{"version":103,"firmware_url":"https://example/fw.bin"}"#;
        assert_eq!(parse_manifest(body), Err(ManifestError::WrongFieldType("version")));
    }

    #[test]
    fn rejects_non_string_url() {
        let body = br#"{"version":"1.0.3","firmware_url":["https://example/fw.bin"]}"#;
        assert_eq!(parse_manifest(body), Err(ManifestError::WrongFieldType("firmware_url")));
    }

    #[test]
    fn rejects_over_length_version() {
        let long = "9".repeat(MAX_VERSION_LEN + 1);
        let body = format!(r#"{{"version":"{}","firmware_url":"https://example/fw.bin"}}"#, long);
        assert_eq!(
            parse_manifest(body.as_bytes()),
            Err(ManifestError::FieldTooLong("version"))
        );
    }

    #[test]
    fn rejects_over_length_url() {
        let long = format!("https://example/{}", "a".repeat(MAX_URL_LEN));
        let body = format!(r#"{{"version":"1.0.3","firmware_url":"{}"}}"#, long);
        assert_eq!(
            parse_manifest(body.as_bytes()),
            Err(ManifestError::FieldTooLong("firmware_url"))
        );
    }

    #[test]
    fn accepts_values_at_exact_bounds() {
        let version = "1".repeat(MAX_VERSION_LEN);
        let url = "u".repeat(MAX_URL_LEN);
        let body = format!(r#"{{"version":"{}","firmware_url":"{}"}}"#, version, url);
        let manifest = parse_manifest(body.as_bytes()).unwrap();
        assert_eq!(manifest.version.len(), MAX_VERSION_LEN);
        assert_eq!(manifest.firmware_url.len(), MAX_URL_LEN);
    }
}
