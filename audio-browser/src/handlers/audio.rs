use crate::models::browse::SessionBrowseState;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

/// Outcome of interpreting a `Range` request header against a body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range: send the whole body.
    Full,
    /// Inclusive start and end offsets.
    Partial(u64, u64),
    Unsatisfiable,
}

/// Parse a single `bytes=` range. Multiple ranges and other units fall back to
/// the full body.
pub fn parse_range(value: &str, len: u64) -> ByteRange {
    let Some(ranges) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = ranges.trim().split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // Suffix range: the last `end` bytes.
        return match end.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if len == 0 => ByteRange::Unsatisfiable,
            Ok(n) => ByteRange::Partial(len.saturating_sub(n), len - 1),
            Err(_) => ByteRange::Full,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    if start >= len {
        return ByteRange::Unsatisfiable;
    }

    let end = if end.is_empty() {
        len - 1
    } else {
        match end.parse::<u64>() {
            Ok(end) if end < start => return ByteRange::Full,
            Ok(end) => end.min(len - 1),
            Err(_) => return ByteRange::Full,
        }
    };

    ByteRange::Partial(start, end)
}

/// Stream one audio file of the selected folder for inline playback.
pub async fn play_audio(
    State(state): State<AppState>,
    browse: SessionBrowseState,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(folder) = browse.state.selected_folder.as_ref() else {
        return Err(AppError::NotFound(anyhow::anyhow!("No folder selected")));
    };

    let files = state.catalog.list_audio_files(&folder.id).await?;
    let Some(file) = files.iter().find(|f| f.id == file_id) else {
        tracing::warn!(
            folder_id = %folder.id,
            file_id = %file_id,
            "Audio request for a file outside the selected folder"
        );
        return Err(AppError::NotFound(anyhow::anyhow!(
            "File {} not found in the selected folder",
            file_id
        )));
    };

    let data = state.catalog.fetch_bytes(&file.id).await?;
    let len = data.len() as u64;

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_range(v, len))
        .unwrap_or(ByteRange::Full);

    let content_type = HeaderValue::from_str(file.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static(crate::models::catalog::DEFAULT_AUDIO_MIME));

    let common = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_DISPOSITION, HeaderValue::from_static("inline")),
        (header::CACHE_CONTROL, HeaderValue::from_static("private, no-store")),
        (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
    ];

    tracing::debug!(
        file_id = %file.id,
        size = len,
        range = ?range,
        "Serving audio"
    );

    match range {
        ByteRange::Full => Ok((StatusCode::OK, common, data).into_response()),
        ByteRange::Partial(start, end) => {
            let body = data.slice(start as usize..=end as usize);
            let content_range = format!("bytes {}-{}/{}", start, end, len);
            Ok((
                StatusCode::PARTIAL_CONTENT,
                common,
                [(header::CONTENT_RANGE, content_range)],
                body,
            )
                .into_response())
        }
        ByteRange::Unsatisfiable => Err(AppError::RangeNotSatisfiable(
            format!("Range outside of {} bytes", len),
            len,
        )),
    }
}
