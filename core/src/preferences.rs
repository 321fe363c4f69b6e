// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use log::debug;
use serde_json::{Map, Value};
use crate::usb::errors::PreferenceError;

/// Key of the date field ordering, e.g. `"ddmmyy"`.
pub const PROPERTY_DATE_FORMAT: &str = "DateFormat";
/// Key of the clock mode, `"12"` or `"24"`.
pub const PROPERTY_CLOCK_TYPE: &str = "ClockType";

pub const DEFAULT_DATE_FORMAT: &str = "ddmmyy";
pub const DEFAULT_CLOCK_TYPE: &str = "24";

const PREFERENCES_FILE_NAME: &str = "preferences.json";
const CONFIG_SUBDIR_NAME: &str = "x52-clock";

/// Read-only source of the string-valued display settings.
///
/// Reads must be cheap and independent; they may happen concurrently from several
/// device sessions.
pub trait PreferenceStore: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;

    fn read_or_default(&self, key: &str, default: &str) -> String {
        self.read(key).unwrap_or_else(|| default.to_string())
    }
}

/// In-memory preference store.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn read(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }
}

/// Preference store backed by a JSON object file, read again on every access.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located in the default configuration directory.
    pub fn in_default_location() -> Self {
        Self::new(default_preferences_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, PreferenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(PreferenceError::NotAnObject),
        }
    }

    /// Stores `value` under `key`, creating the file and its directory when needed.
    pub fn write(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut map = self.load()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn read(&self, key: &str) -> Option<String> {
        let map = match self.load() {
            Ok(map) => map,
            Err(e) => {
                debug!("Ignoring preferences file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match map.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Get config directory (X52_CLOCK_CONFIG_DIR or platform default)
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("X52_CLOCK_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library/Application Support").join(CONFIG_SUBDIR_NAME);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join(CONFIG_SUBDIR_NAME);
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join(CONFIG_SUBDIR_NAME);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config").join(CONFIG_SUBDIR_NAME);
        }
    }

    PathBuf::from(".")
}

pub fn default_preferences_path() -> PathBuf {
    get_config_dir().join(PREFERENCES_FILE_NAME)
}

/// Calendar field shown at one position of the display date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    Day,
    Month,
    Year,
}

impl DateField {
    fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("dd") {
            Some(DateField::Day)
        } else if token.eq_ignore_ascii_case("mm") {
            Some(DateField::Month)
        } else if token.eq_ignore_ascii_case("yy") {
            Some(DateField::Year)
        } else {
            None
        }
    }
}

/// Order of the three date fields on the display, parsed from a code such as `"mmddyy"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateFieldOrder([DateField; 3]);

impl DateFieldOrder {
    pub const DAY_MONTH_YEAR: DateFieldOrder = DateFieldOrder([DateField::Day, DateField::Month, DateField::Year]);

    pub fn new(fields: [DateField; 3]) -> Self {
        Self(fields)
    }

    /// Parses a six character code made of the case-insensitive tokens `dd`, `mm` and `yy`.
    pub fn parse(code: &str) -> Option<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 6 || !code.is_ascii() {
            return None;
        }
        let mut fields = [DateField::Day; 3];
        for (field, token) in fields.iter_mut().zip(code.as_bytes().chunks(2)) {
            let token = std::str::from_utf8(token).ok()?;
            *field = DateField::from_token(token)?;
        }
        Some(Self(fields))
    }

    /// Parses `code`, using day-month-year for any malformed value.
    pub fn from_preference(code: &str) -> Self {
        Self::parse(code).unwrap_or_else(|| {
            debug!("Unsupported date format {:?}, using {:?}", code, DEFAULT_DATE_FORMAT);
            Self::DAY_MONTH_YEAR
        })
    }

    pub fn fields(&self) -> [DateField; 3] {
        self.0
    }
}

impl Default for DateFieldOrder {
    fn default() -> Self {
        Self::DAY_MONTH_YEAR
    }
}

/// 12 or 24 hour presentation of the primary clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClockMode {
    TwelveHour,
    #[default]
    TwentyFourHour,
}

impl ClockMode {
    /// Only `"12"` selects the 12-hour mode.
    pub fn from_preference(value: &str) -> Self {
        match value {
            "12" => ClockMode::TwelveHour,
            "24" => ClockMode::TwentyFourHour,
            other => {
                debug!("Unsupported clock type {:?}, using {:?}", other, DEFAULT_CLOCK_TYPE);
                ClockMode::TwentyFourHour
            }
        }
    }
}

/// Display settings derived from the preference store for a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayPreferences {
    pub date_field_order: DateFieldOrder,
    pub clock_mode: ClockMode,
}

impl DisplayPreferences {
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let date_format = store.read_or_default(PROPERTY_DATE_FORMAT, DEFAULT_DATE_FORMAT);
        let clock_type = store.read_or_default(PROPERTY_CLOCK_TYPE, DEFAULT_CLOCK_TYPE);
        Self {
            date_field_order: DateFieldOrder::from_preference(&date_format),
            clock_mode: ClockMode::from_preference(&clock_type),
        }
    }
}
