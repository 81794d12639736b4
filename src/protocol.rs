//! Remote document format for the detection flag.
//!
//! The flag lives in a Firebase Realtime Database document at
//! `/elephant_detection`. The camera-side producer writes
//! `{"detected": bool, "confidence": f64, "timestamp": f64}`; this
//! controller only ever reads and writes `detected`.
//!
//! Uses `heapless` types for no_std/no-alloc operation.

use core::fmt::Write;

use heapless::String;
use serde::Deserialize;

/// Document path holding the flag
pub const DETECTION_PATH: &str = "/elephant_detection";

/// Boolean field inside the document
pub const DETECTED_FIELD: &str = "detected";

/// REST suffix the database expects on every path
pub const REST_SUFFIX: &str = ".json";

/// Body written to the field to clear it
pub const CLEAR_BODY: &[u8] = b"false";

/// Maximum length for a full request URL including the auth query
pub const MAX_URL_LEN: usize = 256;

/// Buffer type for request URLs
pub type UrlString = String<MAX_URL_LEN>;

/// Maximum size of a document body we are willing to parse
pub const MAX_BODY_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed detection document")]
    Malformed,
    #[error("request url longer than {} bytes", MAX_URL_LEN)]
    UrlTooLong,
}

/// Wire shape of the detection document. Sibling fields written by the
/// producer (`confidence`, `timestamp`) are skipped.
#[derive(Debug, Deserialize)]
struct DetectionDocument {
    #[serde(default)]
    detected: bool,
}

/// Extract `detected` from a raw document body.
///
/// `null` (document absent) and a document without the field both read as
/// `false`.
pub fn parse_detection(body: &[u8]) -> Result<bool, ProtocolError> {
    let trimmed = trim_whitespace(body);
    if trimmed.is_empty() {
        return Err(ProtocolError::Malformed);
    }
    serde_json_core::from_slice::<Option<DetectionDocument>>(trimmed)
        .map(|(doc, _)| doc.is_some_and(|d| d.detected))
        .map_err(|_| ProtocolError::Malformed)
}

/// URL of the whole detection document.
pub fn document_url(base: &str, secret: &str) -> Result<UrlString, ProtocolError> {
    build_url(base, "", secret)
}

/// URL of the `detected` field, used for the clearing write.
pub fn field_url(base: &str, secret: &str) -> Result<UrlString, ProtocolError> {
    build_url(base, DETECTED_FIELD, secret)
}

fn build_url(base: &str, field: &str, secret: &str) -> Result<UrlString, ProtocolError> {
    let mut url = UrlString::new();
    let base = base.trim_end_matches('/');
    write!(url, "{base}{DETECTION_PATH}").map_err(|_| ProtocolError::UrlTooLong)?;
    if !field.is_empty() {
        write!(url, "/{field}").map_err(|_| ProtocolError::UrlTooLong)?;
    }
    url.push_str(REST_SUFFIX)
        .map_err(|_| ProtocolError::UrlTooLong)?;
    if !secret.is_empty() {
        write!(url, "?auth={secret}").map_err(|_| ProtocolError::UrlTooLong)?;
    }
    Ok(url)
}

fn trim_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &data[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_detection ─────────────────────────────────────────────

    #[test]
    fn parse_detected_true() {
        assert_eq!(parse_detection(br#"{"detected":true}"#), Ok(true));
    }

    #[test]
    fn parse_detected_false() {
        assert_eq!(parse_detection(br#"{"detected":false}"#), Ok(false));
    }

    #[test]
    fn parse_tolerates_whitespace() {
        assert_eq!(
            parse_detection(b"  { \"detected\" : true }\n"),
            Ok(true)
        );
    }

    #[test]
    fn parse_ignores_producer_fields() {
        let body = br#"{"confidence":87.25,"detected":true,"timestamp":1718000000.5}"#;
        assert_eq!(parse_detection(body), Ok(true));
    }

    #[test]
    fn parse_null_document_is_not_detected() {
        assert_eq!(parse_detection(b"null"), Ok(false));
    }

    #[test]
    fn parse_missing_field_is_not_detected() {
        assert_eq!(parse_detection(br#"{"confidence":10.0}"#), Ok(false));
    }

    #[test]
    fn parse_rejects_string_flag() {
        assert_eq!(
            parse_detection(br#"{"detected":"true"}"#),
            Err(ProtocolError::Malformed)
        );
    }

    #[test]
    fn parse_rejects_empty_and_garbage() {
        assert_eq!(parse_detection(b""), Err(ProtocolError::Malformed));
        assert_eq!(parse_detection(b"   "), Err(ProtocolError::Malformed));
        assert_eq!(parse_detection(b"<html>"), Err(ProtocolError::Malformed));
    }

    // ── URL building ────────────────────────────────────────────────

    #[test]
    fn document_url_with_secret() {
        let url = document_url("https://ele.firebaseio.com", "s3cret").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ele.firebaseio.com/elephant_detection.json?auth=s3cret"
        );
    }

    #[test]
    fn field_url_strips_trailing_slash() {
        let url = field_url("https://ele.firebaseio.com/", "s3cret").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ele.firebaseio.com/elephant_detection/detected.json?auth=s3cret"
        );
    }

    #[test]
    fn empty_secret_omits_auth() {
        let url = document_url("http://localhost:9000", "").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/elephant_detection.json");
    }

    #[test]
    fn overlong_url_is_rejected() {
        let secret = [b'x'; MAX_URL_LEN];
        let secret = core::str::from_utf8(&secret).unwrap();
        assert_eq!(
            document_url("https://ele.firebaseio.com", secret),
            Err(ProtocolError::UrlTooLong)
        );
    }
}
