use futures::StreamExt;
use thiserror::Error;

/// Errors while reading an HTTP response body
#[derive(Debug, Error)]
pub enum BodyError {
    /// Connection dropped or the stream errored mid-body
    #[error("Body read failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Body exceeded the configured limit
    #[error("Response too large (exceeds {0} bytes)")]
    TooLarge(usize),
    /// Fewer bytes arrived than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    Incomplete { expected: u64, received: usize },
}

/// Read a response body, refusing anything larger than `limit` bytes.
///
/// The Content-Length header is checked up front when present; the stream is
/// checked chunk by chunk either way, since the header may be missing or wrong.
pub async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(BodyError::TooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BodyError::TooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(BodyError::Incomplete {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
