use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::DateMode;

pub const DEFAULT_SERVER: &str = "imap.gmail.com";
pub const DEFAULT_PORT: u16 = 993;
pub const DEFAULT_MAILBOX: &str = "INBOX";
pub const DEFAULT_SUBJECT: &str = "IBM wins";
pub const DEFAULT_WINDOW_MINUTES: i64 = 10;
/// One leap year.
pub const MAX_WINDOW_MINUTES: i64 = 60 * 24 * 366;

fn valid_window(minutes: i64) -> bool {
    (1..=MAX_WINDOW_MINUTES).contains(&minutes)
}

// ---------------------------------------------------------------------------
// On-disk config (every field optional)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_mode: Option<DateMode>,
}

impl FileConfig {
    /// Load a config file. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, String> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path).map_err(|e| format!("read config: {e}"))?;
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| format!("parse config {}: {e}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Runtime config (fully resolved)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub imap_server: String,
    pub imap_port: u16,
    pub mailbox: String,
    /// Offered when the address prompt is left empty.
    pub default_address: Option<String>,
    /// Offered when the subject prompt is left empty.
    pub default_subject: String,
    pub window_minutes: i64,
    /// `None` means the process working directory.
    pub output_dir: Option<PathBuf>,
    pub date_mode: DateMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            imap_server: DEFAULT_SERVER.into(),
            imap_port: DEFAULT_PORT,
            mailbox: DEFAULT_MAILBOX.into(),
            default_address: None,
            default_subject: DEFAULT_SUBJECT.into(),
            window_minutes: DEFAULT_WINDOW_MINUTES,
            output_dir: None,
            date_mode: DateMode::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("neverlight-mail-grab")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ---------------------------------------------------------------------------
// Config resolution
// ---------------------------------------------------------------------------

impl Config {
    /// Defaults, then the config file, then environment variables.
    pub fn resolve(config_path: Option<&Path>) -> Self {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        let mut config = Config::default();
        match FileConfig::load(&path) {
            Ok(Some(file)) => {
                log::info!("Config loaded from {}", path.display());
                config.apply_file(file);
            }
            Ok(None) => log::debug!("No config file at {}", path.display()),
            Err(e) => log::warn!("Config file error, using defaults: {}", e),
        }
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(server) = file.server {
            self.imap_server = server;
        }
        if let Some(port) = file.port {
            self.imap_port = port;
        }
        if let Some(mailbox) = file.mailbox {
            self.mailbox = mailbox;
        }
        if let Some(address) = file.address {
            self.default_address = Some(address);
        }
        if let Some(subject) = file.subject {
            self.default_subject = subject;
        }
        match file.window_minutes {
            Some(minutes) if valid_window(minutes) => self.window_minutes = minutes,
            Some(minutes) => log::warn!(
                "Ignoring window_minutes={minutes} from config file (expected 1..={MAX_WINDOW_MINUTES})"
            ),
            None => {}
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = Some(dir);
        }
        if let Some(mode) = file.date_mode {
            self.date_mode = mode;
        }
    }

    /// Overlay `NEVERLIGHT_GRAB_*` variables read through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(server) = var("NEVERLIGHT_GRAB_SERVER") {
            self.imap_server = server;
        }
        if let Some(port) = var("NEVERLIGHT_GRAB_PORT") {
            match port.parse() {
                Ok(p) => self.imap_port = p,
                Err(e) => log::warn!("Ignoring NEVERLIGHT_GRAB_PORT={port:?}: {e}"),
            }
        }
        if let Some(mailbox) = var("NEVERLIGHT_GRAB_MAILBOX") {
            self.mailbox = mailbox;
        }
        if let Some(address) = var("NEVERLIGHT_GRAB_USER").filter(|a| !a.trim().is_empty()) {
            self.default_address = Some(address);
        }
        if let Some(subject) = var("NEVERLIGHT_GRAB_SUBJECT") {
            self.default_subject = subject;
        }
        if let Some(minutes) = var("NEVERLIGHT_GRAB_WINDOW_MINUTES") {
            match minutes.parse::<i64>() {
                Ok(m) if valid_window(m) => self.window_minutes = m,
                Ok(m) => log::warn!(
                    "Ignoring NEVERLIGHT_GRAB_WINDOW_MINUTES={m} (expected 1..={MAX_WINDOW_MINUTES})"
                ),
                Err(e) => log::warn!("Ignoring NEVERLIGHT_GRAB_WINDOW_MINUTES={minutes:?}: {e}"),
            }
        }
        if let Some(dir) = var("NEVERLIGHT_GRAB_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(dir));
        }
    }

    /// Where attachments are written.
    pub fn output_dir(&self) -> Result<PathBuf, String> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(|e| format!("current directory: {e}")),
        }
    }
}
