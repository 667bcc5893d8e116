use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use url::{ParseError, Url};

use crate::error::PipelineError;

/// A user-supplied image source resolved to something fetchable.
///
/// Sources accepted:
/// - `http://` / `https://` URLs, fetched over the network
/// - `file://` URLs and bare filesystem paths, read from disk
/// - `data:` URIs with a base64 (or verbatim) payload, no I/O at all
///
/// The resolved `key` is the canonical cache identity: equivalent spellings
/// of the same resource (a bare absolute path and its `file://` form, say)
/// resolve to the same key and therefore share one cache entry.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    key: String,
    pub(crate) location: Location,
}

#[derive(Debug, Clone)]
pub(crate) enum Location {
    Http(Url),
    File(PathBuf),
    Data(Bytes),
}

impl ResolvedSource {
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Payload bytes when the source is a `data:` URI.
    #[must_use]
    pub(crate) fn inline_bytes(&self) -> Option<Bytes> {
        match &self.location {
            Location::Data(bytes) => Some(bytes.clone()),
            Location::Http(_) | Location::File(_) => None,
        }
    }
}

/// Resolve a raw source string into a fetch location and cache key.
pub fn resolve(input: &str) -> Result<ResolvedSource, PipelineError> {
    if input.is_empty() {
        return Err(PipelineError::InvalidSource("empty source".to_owned()));
    }
    if input
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
    {
        return resolve_data_uri(input);
    }

    match Url::parse(input) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(ResolvedSource {
                key: url.to_string(),
                location: Location::Http(url),
            }),
            "file" => {
                let path = url.to_file_path().map_err(|()| {
                    PipelineError::InvalidSource(format!("bad file url: {input}"))
                })?;
                Ok(ResolvedSource {
                    key: url.to_string(),
                    location: Location::File(path),
                })
            }
            other => Err(PipelineError::InvalidSource(format!(
                "unsupported scheme {other}"
            ))),
        },
        // A bare filesystem path is not parseable as an absolute URL.
        Err(ParseError::RelativeUrlWithoutBase) => {
            let path = PathBuf::from(input);
            let key = Url::from_file_path(&path)
                .map_or_else(|()| input.to_owned(), |url| url.to_string());
            Ok(ResolvedSource {
                key,
                location: Location::File(path),
            })
        }
        Err(err) => Err(PipelineError::InvalidSource(format!("{input}: {err}"))),
    }
}

/// `data:[<mediatype>][;base64],<payload>` — the payload is base64-decoded
/// when flagged, otherwise taken verbatim. The whole URI string is the
/// cache key.
fn resolve_data_uri(input: &str) -> Result<ResolvedSource, PipelineError> {
    let body = &input[5..];
    let Some((meta, payload)) = body.split_once(',') else {
        return Err(PipelineError::InvalidSource(
            "data uri without a comma separator".to_owned(),
        ));
    };

    let bytes = if meta
        .rsplit(';')
        .next()
        .is_some_and(|tail| tail.eq_ignore_ascii_case("base64"))
    {
        BASE64
            .decode(payload.trim())
            .map_err(|err| PipelineError::InvalidSource(format!("bad base64 payload: {err}")))?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(ResolvedSource {
        key: input.to_owned(),
        location: Location::Data(Bytes::from(bytes)),
    })
}
