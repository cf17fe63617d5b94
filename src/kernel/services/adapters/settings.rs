//! 设置文件与日志目录
//!
//! - 设置: <cache>/.zsearch/settings.json
//! - 日志: <data>/zsearch/logs
//! - `ZSEARCH_HOME` 存在时两者都放在该目录下

use crate::kernel::services::ports::settings::Settings;
use std::io;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "zsearch";
const HOME_ENV: &str = "ZSEARCH_HOME";
const SETTINGS_DIR: &str = ".zsearch";
const SETTINGS_FILE: &str = "settings.json";
const LOG_DIR: &str = "logs";

#[derive(Clone, Copy)]
enum BaseDir {
    /// 可丢弃的用户状态目录，放设置文件
    Cache,
    /// 长期保存的用户数据目录，放日志
    Data,
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn app_home() -> Option<PathBuf> {
    env_path(HOME_ENV)
}

#[cfg(target_os = "linux")]
fn base_dir(kind: BaseDir) -> Option<PathBuf> {
    let (xdg, fallback) = match kind {
        BaseDir::Cache => ("XDG_CACHE_HOME", ".cache"),
        BaseDir::Data => ("XDG_DATA_HOME", ".local/share"),
    };
    env_path(xdg).or_else(|| env_path("HOME").map(|home| home.join(fallback)))
}

#[cfg(target_os = "macos")]
fn base_dir(kind: BaseDir) -> Option<PathBuf> {
    let sub = match kind {
        BaseDir::Cache => "Library/Caches",
        BaseDir::Data => "Library/Application Support",
    };
    env_path("HOME").map(|home| home.join(sub))
}

#[cfg(target_os = "windows")]
fn base_dir(kind: BaseDir) -> Option<PathBuf> {
    match kind {
        BaseDir::Cache => env_path("LOCALAPPDATA").or_else(|| env_path("APPDATA")),
        BaseDir::Data => env_path("APPDATA"),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn base_dir(_kind: BaseDir) -> Option<PathBuf> {
    None
}

pub fn get_settings_path() -> Option<PathBuf> {
    if let Some(home) = app_home() {
        return Some(home.join(SETTINGS_FILE));
    }
    base_dir(BaseDir::Cache).map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

/// 从 `path` 读取设置。文件不存在时静默返回 None；无法读取或格式错误时记录警告。
/// 两种情况调用方都回退到默认设置。
pub fn load_settings_from(path: &Path) -> Option<Settings> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "settings unreadable, using defaults");
            return None;
        }
    };
    serde_json::from_str(&data)
        .map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "settings malformed, using defaults");
        })
        .ok()
}

pub fn save_settings(path: &Path, settings: &Settings) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(settings).map_err(io::Error::other)?;
    content.push('\n');
    std::fs::write(path, content)
}

pub fn get_log_dir() -> Option<PathBuf> {
    if let Some(home) = app_home() {
        return Some(home.join(LOG_DIR));
    }
    base_dir(BaseDir::Data).map(|dir| dir.join(APP_NAME).join(LOG_DIR))
}

pub fn ensure_log_dir() -> io::Result<PathBuf> {
    let dir = get_log_dir().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "no per-user data directory for logs")
    })?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/settings.rs"]
mod tests;
