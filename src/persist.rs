use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::PerformanceMode;
use crate::state::AppState;
use crate::view::ResultsTab;

const PREFS_DIR: &str = "matchlens_terminal";
const PREFS_FILE: &str = "prefs.json";
const PREFS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Prefs {
    pub version: u32,
    #[serde(default)]
    pub last_video_path: Option<String>,
    #[serde(default)]
    pub mode: Option<PerformanceMode>,
    #[serde(default)]
    pub results_tab: Option<String>,
}

pub fn load_into_state(state: &mut AppState) {
    let Some(path) = prefs_path() else {
        return;
    };
    if let Some(prefs) = load_prefs_file(&path) {
        apply_prefs(state, &prefs);
    }
}

pub fn save_from_state(state: &AppState) {
    let Some(path) = prefs_path() else {
        return;
    };
    save_prefs_file(&path, &prefs_from_state(state));
}

pub fn apply_prefs(state: &mut AppState, prefs: &Prefs) {
    if let Some(path) = prefs.last_video_path.as_ref()
        && state.path_input.is_empty()
    {
        state.path_input = path.clone();
    }
    if let Some(mode) = prefs.mode {
        state.mode = mode;
    }
    if let Some(tab) = prefs.results_tab.as_deref().and_then(ResultsTab::from_key) {
        state.results_tab = tab;
    }
}

pub fn prefs_from_state(state: &AppState) -> Prefs {
    let last_video_path = state
        .video
        .as_ref()
        .map(|v| v.path.display().to_string())
        .or_else(|| Some(state.path_input.trim().to_string()).filter(|p| !p.is_empty()));
    Prefs {
        version: PREFS_VERSION,
        last_video_path,
        mode: Some(state.mode),
        results_tab: Some(state.results_tab.key().to_string()),
    }
}

pub fn load_prefs_file(path: &Path) -> Option<Prefs> {
    let raw = fs::read_to_string(path).ok()?;
    let prefs = serde_json::from_str::<Prefs>(&raw).ok()?;
    if prefs.version != PREFS_VERSION {
        return None;
    }
    Some(prefs)
}

pub fn save_prefs_file(path: &Path, prefs: &Prefs) {
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    if let Ok(json) = serde_json::to_string_pretty(prefs) {
        let tmp = path.with_extension("json.tmp");
        if fs::write(&tmp, json).is_ok() {
            let _ = fs::rename(&tmp, path);
        }
    }
}

fn prefs_path() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(PREFS_DIR).join(PREFS_FILE));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(PREFS_DIR)
            .join(PREFS_FILE),
    )
}
