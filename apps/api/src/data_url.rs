//! `data:<mime>;base64,<payload>` parsing, shared by image capture uploads
//! and document parsing.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a base64 data URL")]
    NotDataUrl,

    #[error("invalid base64 payload: {0}")]
    Base64(String),

    #[error("payload is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Lower-cased media type, e.g. `image/png`. Empty when the URL omits it.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Parses a data URL. A bare base64 string (no `data:` prefix) is also
    /// accepted, with an empty media type.
    pub fn parse(input: &str) -> Result<Self, DataUrlError> {
        let input = input.trim();
        let (mime, payload) = match input.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotDataUrl)?;
                let mime = header
                    .strip_suffix(";base64")
                    .ok_or(DataUrlError::NotDataUrl)?;
                (mime.to_ascii_lowercase(), payload)
            }
            None => (String::new(), input),
        };

        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| DataUrlError::Base64(e.to_string()))?;
        if bytes.is_empty() {
            return Err(DataUrlError::Empty);
        }
        Ok(Self { mime, bytes })
    }

    /// Base64 payload without the `data:` header.
    pub fn encoded(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}
