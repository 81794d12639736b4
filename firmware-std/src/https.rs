//! Blocking HTTPS transport over the ESP-IDF HTTP client.
//!
//! One client is kept across polls and rebuilt after any failure, so a
//! dropped TLS session costs one failed poll rather than a stuck device.

use core::time::Duration;

use anyhow::bail;
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use esp_idf_svc::http::Method;

use elesafe::store::{HttpResponse, HttpTransport};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpsTransport {
    conn: Option<EspHttpConnection>,
}

impl HttpsTransport {
    pub fn new() -> Self {
        Self { conn: None }
    }

    fn connection(&mut self) -> anyhow::Result<&mut EspHttpConnection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => EspHttpConnection::new(&HttpConfiguration {
                timeout: Some(REQUEST_TIMEOUT),
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            })?,
        };
        Ok(self.conn.insert(conn))
    }
}

impl HttpTransport for HttpsTransport {
    type Error = anyhow::Error;

    fn is_ready(&mut self) -> bool {
        match self.connection() {
            Ok(_) => true,
            Err(e) => {
                log::warn!("HTTP client unavailable: {:?}", e);
                false
            }
        }
    }

    fn get(&mut self, url: &str, buf: &mut [u8]) -> anyhow::Result<HttpResponse> {
        let result = fetch(self.connection()?, url, buf);
        if result.is_err() {
            self.conn = None;
        }
        result
    }

    fn put(&mut self, url: &str, body: &[u8]) -> anyhow::Result<u16> {
        let result = store(self.connection()?, url, body);
        if result.is_err() {
            self.conn = None;
        }
        result
    }
}

fn fetch(conn: &mut EspHttpConnection, url: &str, buf: &mut [u8]) -> anyhow::Result<HttpResponse> {
    conn.initiate_request(Method::Get, url, &[("accept", "application/json")])?;
    conn.initiate_response()?;
    let status = conn.status();
    let len = read_body(conn, buf)?;
    Ok(HttpResponse { status, len })
}

fn store(conn: &mut EspHttpConnection, url: &str, body: &[u8]) -> anyhow::Result<u16> {
    let content_length = body.len().to_string();
    conn.initiate_request(
        Method::Put,
        url,
        &[
            ("content-type", "application/json"),
            ("content-length", &content_length),
        ],
    )?;

    let mut sent = 0;
    while sent < body.len() {
        let n = conn.write(&body[sent..])?;
        if n == 0 {
            bail!("connection closed after {} of {} body bytes", sent, body.len());
        }
        sent += n;
    }

    conn.initiate_response()?;
    let status = conn.status();
    // Drain the echoed value so the connection can be reused
    let mut sink = [0u8; 64];
    read_body(conn, &mut sink)?;
    Ok(status)
}

/// Read the whole body. Bytes past `buf` are counted but discarded, so a
/// returned length larger than `buf.len()` signals truncation.
fn read_body(conn: &mut EspHttpConnection, buf: &mut [u8]) -> anyhow::Result<usize> {
    let mut total = 0;
    let mut overflow = [0u8; 64];
    loop {
        let n = if total < buf.len() {
            conn.read(&mut buf[total..])?
        } else {
            conn.read(&mut overflow)?
        };
        if n == 0 {
            return Ok(total);
        }
        total += n;
    }
}
