//! Remote flag store client.
//!
//! [`FlagStore`] is the narrow seam the controller sees: is the session
//! usable, what is the flag, clear the flag. [`FirebaseStore`] implements it
//! over the Realtime Database REST API on top of any blocking
//! [`HttpTransport`], so the platform only has to supply raw GET/PUT.

use crate::config::Credentials;
use crate::protocol::{self, ProtocolError, CLEAR_BODY, MAX_BODY_LEN};

/// Status line and body length of a completed GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Bytes written into the caller's buffer
    pub len: usize,
}

/// Blocking HTTP(S) client supplied by the platform.
pub trait HttpTransport {
    type Error: core::fmt::Debug;

    /// Whether a request could be issued right now (network up, client built).
    fn is_ready(&mut self) -> bool;

    /// GET `url`, writing the body into `buf`.
    ///
    /// A body larger than `buf` must be reported with `len > buf.len()`.
    fn get(&mut self, url: &str, buf: &mut [u8]) -> Result<HttpResponse, Self::Error>;

    /// PUT `body` to `url`, returning the status code.
    fn put(&mut self, url: &str, body: &[u8]) -> Result<u16, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("transport failure")]
    Transport,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("response body exceeds {} bytes", MAX_BODY_LEN)]
    BodyTooLarge,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Reads and clears the single `detected` flag.
pub trait FlagStore {
    fn is_ready(&mut self) -> bool;
    fn read_detection_flag(&mut self) -> Result<bool, StoreError>;
    fn clear_detection_flag(&mut self) -> Result<(), StoreError>;
}

/// Firebase Realtime Database client for the detection document.
pub struct FirebaseStore<T> {
    transport: T,
    db_url: &'static str,
    db_secret: &'static str,
    body: [u8; MAX_BODY_LEN],
}

impl<T: HttpTransport> FirebaseStore<T> {
    pub fn new(transport: T, credentials: &Credentials) -> Self {
        Self {
            transport,
            db_url: credentials.db_url,
            db_secret: credentials.db_secret,
            body: [0; MAX_BODY_LEN],
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: HttpTransport> FlagStore for FirebaseStore<T> {
    fn is_ready(&mut self) -> bool {
        self.transport.is_ready()
    }

    fn read_detection_flag(&mut self) -> Result<bool, StoreError> {
        let url = protocol::document_url(self.db_url, self.db_secret)?;
        let resp = self.transport.get(&url, &mut self.body).map_err(|e| {
            log::warn!("GET {} failed: {:?}", protocol::DETECTION_PATH, e);
            StoreError::Transport
        })?;

        if !(200..300).contains(&resp.status) {
            return Err(StoreError::Status(resp.status));
        }
        if resp.len > self.body.len() {
            return Err(StoreError::BodyTooLarge);
        }

        let body = &self.body[..resp.len];
        if let Ok(text) = core::str::from_utf8(body) {
            log::debug!("Document: {}", text.trim_end());
        }
        Ok(protocol::parse_detection(body)?)
    }

    fn clear_detection_flag(&mut self) -> Result<(), StoreError> {
        let url = protocol::field_url(self.db_url, self.db_secret)?;
        let status = self.transport.put(&url, CLEAR_BODY).map_err(|e| {
            log::warn!("PUT {} failed: {:?}", protocol::DETECTION_PATH, e);
            StoreError::Transport
        })?;

        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(StoreError::Status(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDS: Credentials = Credentials {
        wifi_ssid: "ssid",
        wifi_password: "pass",
        db_url: "https://ele.firebaseio.com",
        db_secret: "abc",
    };

    /// Canned transport: serves one body for every GET, records PUTs.
    struct FakeTransport {
        ready: bool,
        get_status: u16,
        get_body: &'static [u8],
        get_fails: bool,
        put_status: u16,
        puts: std::vec::Vec<(std::string::String, std::vec::Vec<u8>)>,
        gets: std::vec::Vec<std::string::String>,
    }

    impl FakeTransport {
        fn serving(body: &'static [u8]) -> Self {
            Self {
                ready: true,
                get_status: 200,
                get_body: body,
                get_fails: false,
                put_status: 200,
                puts: std::vec::Vec::new(),
                gets: std::vec::Vec::new(),
            }
        }
    }

    impl HttpTransport for FakeTransport {
        type Error = &'static str;

        fn is_ready(&mut self) -> bool {
            self.ready
        }

        fn get(&mut self, url: &str, buf: &mut [u8]) -> Result<HttpResponse, Self::Error> {
            self.gets.push(url.into());
            if self.get_fails {
                return Err("connection reset");
            }
            let n = self.get_body.len().min(buf.len());
            buf[..n].copy_from_slice(&self.get_body[..n]);
            Ok(HttpResponse {
                status: self.get_status,
                len: self.get_body.len(),
            })
        }

        fn put(&mut self, url: &str, body: &[u8]) -> Result<u16, Self::Error> {
            self.puts.push((url.into(), body.to_vec()));
            Ok(self.put_status)
        }
    }

    #[test]
    fn reads_true_flag_from_document_url() {
        let mut store = FirebaseStore::new(FakeTransport::serving(br#"{"detected":true}"#), &CREDS);
        assert_eq!(store.read_detection_flag(), Ok(true));
        assert_eq!(
            store.transport().gets,
            ["https://ele.firebaseio.com/elephant_detection.json?auth=abc"]
        );
    }

    #[test]
    fn reads_false_flag() {
        let mut store =
            FirebaseStore::new(FakeTransport::serving(br#"{"detected":false}"#), &CREDS);
        assert_eq!(store.read_detection_flag(), Ok(false));
    }

    #[test]
    fn non_success_status_is_an_error() {
        let mut transport = FakeTransport::serving(br#"{"error":"Permission denied"}"#);
        transport.get_status = 401;
        let mut store = FirebaseStore::new(transport, &CREDS);
        assert_eq!(store.read_detection_flag(), Err(StoreError::Status(401)));
    }

    #[test]
    fn transport_failure_maps_to_transport_error() {
        let mut transport = FakeTransport::serving(b"");
        transport.get_fails = true;
        let mut store = FirebaseStore::new(transport, &CREDS);
        assert_eq!(store.read_detection_flag(), Err(StoreError::Transport));
    }

    #[test]
    fn oversized_body_is_rejected() {
        static BIG: [u8; MAX_BODY_LEN + 1] = [b' '; MAX_BODY_LEN + 1];
        let mut store = FirebaseStore::new(FakeTransport::serving(&BIG), &CREDS);
        assert_eq!(store.read_detection_flag(), Err(StoreError::BodyTooLarge));
    }

    #[test]
    fn malformed_body_is_a_protocol_error() {
        let mut store = FirebaseStore::new(FakeTransport::serving(b"<html>"), &CREDS);
        assert_eq!(
            store.read_detection_flag(),
            Err(StoreError::Protocol(ProtocolError::Malformed))
        );
    }

    #[test]
    fn clear_puts_false_to_field_url() {
        let mut store = FirebaseStore::new(FakeTransport::serving(b""), &CREDS);
        assert_eq!(store.clear_detection_flag(), Ok(()));
        let puts = &store.transport().puts;
        assert_eq!(puts.len(), 1);
        assert_eq!(
            puts[0].0,
            "https://ele.firebaseio.com/elephant_detection/detected.json?auth=abc"
        );
        assert_eq!(puts[0].1, b"false");
    }

    #[test]
    fn clear_reports_rejected_write() {
        let mut transport = FakeTransport::serving(b"");
        transport.put_status = 403;
        let mut store = FirebaseStore::new(transport, &CREDS);
        assert_eq!(store.clear_detection_flag(), Err(StoreError::Status(403)));
    }

    #[test]
    fn readiness_follows_transport() {
        let mut transport = FakeTransport::serving(b"");
        transport.ready = false;
        let mut store = FirebaseStore::new(transport, &CREDS);
        assert!(!store.is_ready());
    }
}
