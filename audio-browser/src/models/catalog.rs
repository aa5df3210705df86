use serde::{Deserialize, Serialize};

/// A remote folder as listed by the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

/// A remote file as listed by the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// File name suffixes accepted as playable audio, compared case-insensitively.
pub const AUDIO_EXTENSIONS: &[&str] = &[".wav", ".wave"];

/// Content type used when the store does not report one.
pub const DEFAULT_AUDIO_MIME: &str = "audio/wav";

impl FileRef {
    pub fn is_audio(&self) -> bool {
        is_audio_name(&self.name)
    }

    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|m| m.starts_with("audio/"))
            .unwrap_or(DEFAULT_AUDIO_MIME)
    }

    /// Human readable size, e.g. `1.4 MB`.
    pub fn display_size(&self) -> String {
        match self.size {
            Some(bytes) => format_size(bytes),
            None => String::new(),
        }
    }
}

pub fn is_audio_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    AUDIO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
