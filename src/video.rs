use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ApiError;

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "webm", "mpg", "mpeg", "wmv", "flv", "3gp", "ts",
];

/// A local match video that passed validation and can be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl VideoFile {
    pub fn open(raw: &str) -> Result<Self, ApiError> {
        let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
        if trimmed.is_empty() {
            return Err(ApiError::validation("No video file selected"));
        }
        let path = expand_home(trimmed);
        if !is_video_path(&path) {
            return Err(ApiError::validation(format!(
                "Not a video file: {}",
                path.display()
            )));
        }
        let meta = fs::metadata(&path).map_err(|err| {
            ApiError::validation(format!("Cannot read {}: {err}", path.display()))
        })?;
        if !meta.is_file() {
            return Err(ApiError::validation(format!(
                "Not a file: {}",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| trimmed.to_string());
        Ok(Self {
            path,
            name,
            size_bytes: meta.len(),
        })
    }

    pub fn size_label(&self) -> String {
        format_file_size(self.size_bytes)
    }
}

pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // Trailing zeros are dropped: "1.5 MB", "2 KB".
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[unit])
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
        && !home.trim().is_empty()
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(raw)
}
