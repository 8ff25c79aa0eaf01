//! One-shot ICY (Icecast/Shoutcast) metadata reader.
//!
//! Opens the stream with `Icy-MetaData: 1`, skips the first `icy-metaint`
//! audio bytes, reads the single metadata block that follows and returns its
//! `StreamTitle`.  The connection is dropped as soon as the block is read (or
//! the read fails); there is no persistent listener and no retry here.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, RANGE};
use tracing::debug;

use crate::error::{IcyError, Result};
use crate::snapshot::NowPlayingSnapshot;
use crate::station::StationDescriptor;

pub const ICY_METAINT_HEADER: &str = "icy-metaint";
const STREAM_TITLE_MARKER: &str = "StreamTitle='";
const TITLE_SEPARATOR: &str = " - ";

/// Reads the current `StreamTitle` from an ICY stream.
pub async fn fetch_stream_title(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String> {
    let response = client
        .get(url)
        .header("Icy-MetaData", "1")
        // Ask for as little audio as the server is willing to skip.
        .header(RANGE, "0")
        .timeout(timeout)
        .send()
        .await?;

    let metaint = metaint_from_headers(response.headers()).ok_or(IcyError::NoMetaint)?;
    debug!("[icy] {} advertises metaint={}", url, metaint);

    let block = read_metadata_block(response.bytes_stream(), metaint).await?;
    let raw = decode_metadata(block);
    parse_stream_title(&raw)
}

/// `icy-metaint` as a strictly positive integer.
pub fn metaint_from_headers(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(ICY_METAINT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Skips `metaint` audio bytes and returns the metadata block that follows.
///
/// A stream that closes inside the block yields whatever was read so far;
/// one that closes before the length byte is an `InvalidStream`.
pub(crate) async fn read_metadata_block<S, B>(stream: S, metaint: usize) -> Result<Vec<u8>>
where
    S: Stream<Item = reqwest::Result<B>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut skipped = 0usize;
    let mut block_len: Option<usize> = None;
    let mut block = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let mut data = chunk.as_ref();

        if skipped < metaint {
            let take = (metaint - skipped).min(data.len());
            skipped += take;
            data = &data[take..];
        }
        if data.is_empty() {
            continue;
        }

        let len = match block_len {
            Some(len) => len,
            None => {
                let len = usize::from(data[0]) * 16;
                if len == 0 {
                    return Err(IcyError::NoMetadata.into());
                }
                block.reserve_exact(len);
                block_len = Some(len);
                data = &data[1..];
                len
            }
        };

        let want = (len - block.len()).min(data.len());
        block.extend_from_slice(&data[..want]);
        if block.len() == len {
            return Ok(block);
        }
    }

    match block_len {
        Some(_) => Ok(block),
        None => Err(IcyError::InvalidStream.into()),
    }
}

/// UTF-8 first, Latin-1 otherwise.
fn decode_metadata(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| char::from(b)).collect(),
    }
}

/// Extracts the `StreamTitle='...'` value.
///
/// `''` inside the value is an escaped quote; `';` terminates it, and so does
/// any other lone `'`.
pub fn parse_stream_title(raw: &str) -> Result<String> {
    let start = raw.find(STREAM_TITLE_MARKER).ok_or(IcyError::NoMetadata)?;
    let mut chars = raw[start + STREAM_TITLE_MARKER.len()..].chars().peekable();

    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                value.push('\'');
                continue;
            }
            break;
        }
        value.push(c);
    }

    let title = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if title.is_empty() {
        return Err(IcyError::NoMetadata.into());
    }
    Ok(title.to_string())
}

/// Splits "Artist - Title" on the first separator into `(title, subtitle)`.
/// Without a separator the station name becomes the subtitle.
pub fn split_stream_title(stream_title: &str, station: &StationDescriptor) -> (String, Option<String>) {
    if let Some((artist, title)) = stream_title.split_once(TITLE_SEPARATOR) {
        if !title.trim().is_empty() {
            return (title.to_string(), Some(artist.to_string()));
        }
    }
    (stream_title.to_string(), Some(station.display_title()))
}

pub fn snapshot_from_stream_title(
    stream_title: &str,
    station: &StationDescriptor,
) -> NowPlayingSnapshot {
    let (title, subtitle) = split_stream_title(stream_title, station);
    NowPlayingSnapshot::from_parts(station, Some(title), subtitle, None)
}
