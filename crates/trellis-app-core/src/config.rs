// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Preference storage for Trellis tools.
//!
//! Values are JSON documents addressed by a flat key (`chart_prefs`, ...).
//! A [`ConfigStore`] only moves bytes; [`ConfigService`] owns the JSON layer
//! and the key rules so every backend accepts the same keys.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::prefs::{ChartPrefs, CHART_PREFS_KEY};

/// Byte storage behind a [`ConfigService`].
pub trait ConfigStore {
    /// Blob saved under `key`, or [`ConfigError::NotFound`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replace the blob under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Failures while reading or writing preferences.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("[CONFIG_NOT_FOUND] not found")]
    NotFound,
    /// Key is empty, hidden, or contains a path separator.
    #[error("[CONFIG_INVALID_KEY] invalid config key '{0}'")]
    InvalidKey(String),
    /// Backend I/O failure.
    #[error("[CONFIG_IO] {0}")]
    Io(#[from] std::io::Error),
    /// Stored document is not valid JSON for the requested type.
    #[error("[CONFIG_SERDE] {0}")]
    Serde(#[from] serde_json::Error),
    /// Backend-specific failure.
    #[error("[CONFIG_OTHER] {0}")]
    Other(String),
}

/// Rejects keys a file-backed store could not map to a single file name.
pub fn check_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
        return Err(ConfigError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// Typed JSON access to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wrap `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwrap the service.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Document under `key`; a missing or zero-length blob is `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        check_key(key)?;
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// [`load`](Self::load), with `T::default()` standing in for nothing stored.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Store `value` as pretty JSON under `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        check_key(key)?;
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Load (or default) the document under `key`, let `edit` change it, and
    /// save the result. Returns the saved value.
    pub fn update<T, F>(&self, key: &str, edit: F) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T),
    {
        let mut value: T = self.load_or_default(key)?;
        edit(&mut value);
        self.save(key, &value)?;
        Ok(value)
    }

    /// Saved chart preferences, or the built-in defaults.
    pub fn chart_prefs(&self) -> Result<ChartPrefs, ConfigError> {
        self.load_or_default(CHART_PREFS_KEY)
    }

    /// Replace the saved chart preferences.
    pub fn save_chart_prefs(&self, prefs: &ChartPrefs) -> Result<(), ConfigError> {
        self.save(CHART_PREFS_KEY, prefs)
    }
}
