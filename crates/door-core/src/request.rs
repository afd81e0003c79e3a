//! Report request format
//!
//! One HTTP/1.0 POST per report. HTTP/1.0 keeps the connection
//! non-persistent, so the server closes it after responding and the reader
//! can treat end-of-stream as the end of the response.

use core::fmt::Write;

use heapless::String;
use thiserror_no_std::Error;

use crate::config::ApiConfig;
use crate::sensor::SensorLevel;

/// Capacity of the full request (status line, headers and body).
pub const REQUEST_CAPACITY: usize = 512;
/// Capacity of the form body alone.
pub const BODY_CAPACITY: usize = 128;

pub const USER_AGENT: &str = concat!("door-sensor/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    #[error("report body does not fit its buffer")]
    BodyTooLong,
    #[error("report request does not fit its buffer")]
    RequestTooLong,
}

/// A fully formatted report, immutable once built.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    text: String<REQUEST_CAPACITY>,
    body_len: usize,
    level: SensorLevel,
}

impl ReportRequest {
    /// Format the report for `level`.
    ///
    /// `Content-Length` is computed from the formatted body, so keys of any
    /// length that fit the buffers produce a consistent request.
    pub fn new(api: &ApiConfig<'_>, level: SensorLevel) -> Result<Self, RequestError> {
        let mut body: String<BODY_CAPACITY> = String::new();
        write!(body, "code={}&state={}", api.key, level.as_digit())
            .map_err(|_| RequestError::BodyTooLong)?;

        let mut text: String<REQUEST_CAPACITY> = String::new();
        write!(
            text,
            "POST {path} HTTP/1.0\r\n\
             Host: {host}\r\n\
             User-Agent: {USER_AGENT}\r\n\
             Content-Length: {len}\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             \r\n\
             {body}",
            path = api.path,
            host = api.host,
            len = body.len(),
        )
        .map_err(|_| RequestError::RequestTooLong)?;

        Ok(Self {
            body_len: body.len(),
            text,
            level,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// The form body, `code=<key>&state=<0|1>`
    pub fn body(&self) -> &str {
        &self.text[self.text.len() - self.body_len..]
    }

    pub fn content_length(&self) -> usize {
        self.body_len
    }

    pub fn level(&self) -> SensorLevel {
        self.level
    }
}
