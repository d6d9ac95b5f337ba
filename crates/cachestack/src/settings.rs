//! Construction-time cache settings.

use cachestack_core::CacheError;
use cachestack_sync::DEFAULT_SEGMENTS;
use serde::{Deserialize, Serialize};

/// How a settings-built cache synchronizes access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SynchronizationMode {
    /// Caching disabled; every lookup runs the factory.
    Disabled,
    /// One reentrant lock held for every operation, factory included.
    CoarseLock,
    /// Lock-striped cache with per-key single flight.
    #[default]
    Concurrent,
    /// Coarse lock for bookkeeping only; factories run outside it.
    LazyLock,
}

/// Settings consumed by [`CacheFactory::from_settings`](crate::CacheFactory::from_settings).
///
/// ```
/// use cachestack::{CacheSettings, SynchronizationMode};
///
/// let settings = CacheSettings::from_yaml("mode: lazyLock\nignoreCase: true\n").unwrap();
/// assert_eq!(settings.mode(), SynchronizationMode::LazyLock);
/// assert!(settings.ignore_case());
/// assert_eq!(settings.segments(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    /// Synchronization strategy.
    #[serde(default)]
    mode: SynchronizationMode,

    /// Compare string keys ignoring ASCII case.
    #[serde(default)]
    ignore_case: bool,

    /// Lock-stripe count for the concurrent cache.
    #[serde(default = "default_segments")]
    segments: usize,

    /// Bind the cache to a fresh invalidation token.
    #[serde(default)]
    invalidation: bool,
}

fn default_segments() -> usize {
    DEFAULT_SEGMENTS
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            mode: SynchronizationMode::default(),
            ignore_case: false,
            segments: default_segments(),
            invalidation: false,
        }
    }
}

impl CacheSettings {
    /// Creates a new builder for CacheSettings.
    pub fn builder() -> CacheSettingsBuilder {
        CacheSettingsBuilder::default()
    }

    /// Parses and validates settings from JSON.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` for malformed input or invalid values.
    pub fn from_json(text: &str) -> Result<Self, CacheError> {
        let settings: Self = serde_json::from_str(text)
            .map_err(|e| CacheError::invalid_settings(format!("JSON: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses and validates settings from YAML.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` for malformed input or invalid values.
    pub fn from_yaml(text: &str) -> Result<Self, CacheError> {
        let settings: Self = serde_yaml::from_str(text)
            .map_err(|e| CacheError::invalid_settings(format!("YAML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serializes the settings to JSON.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` if serialization fails.
    pub fn to_json(&self) -> Result<String, CacheError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CacheError::invalid_settings(format!("JSON: {e}")))
    }

    /// Checks value constraints not expressible in the serde schema.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` if `segments` is zero or not a
    /// power of two.
    pub fn validate(&self) -> Result<(), CacheError> {
        if !self.segments.is_power_of_two() {
            return Err(CacheError::invalid_settings(format!(
                "segments must be a power of two, got {}",
                self.segments
            )));
        }
        Ok(())
    }

    /// Retorna el modo de sincronizacion
    pub fn mode(&self) -> SynchronizationMode {
        self.mode
    }

    /// Indica si las claves string ignoran mayusculas ASCII
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Retorna el numero de segmentos
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Indica si se asocia un token de invalidacion
    pub fn invalidation(&self) -> bool {
        self.invalidation
    }
}

/// Builder for CacheSettings.
#[derive(Debug, Default)]
pub struct CacheSettingsBuilder {
    mode: SynchronizationMode,
    ignore_case: bool,
    segments: Option<usize>,
    invalidation: bool,
}

impl CacheSettingsBuilder {
    /// Define el modo de sincronizacion
    pub fn mode(mut self, mode: SynchronizationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Define si las claves string ignoran mayusculas ASCII
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Define el numero de segmentos (potencia de dos)
    pub fn segments(mut self, segments: usize) -> Self {
        self.segments = Some(segments);
        self
    }

    /// Define si se asocia un token de invalidacion
    pub fn invalidation(mut self, invalidation: bool) -> Self {
        self.invalidation = invalidation;
        self
    }

    /// Construye y valida los settings.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidSettings` if validation fails.
    pub fn build(self) -> Result<CacheSettings, CacheError> {
        let settings = CacheSettings {
            mode: self.mode,
            ignore_case: self.ignore_case,
            segments: self.segments.unwrap_or_else(default_segments),
            invalidation: self.invalidation,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::default();

        assert_eq!(settings.mode(), SynchronizationMode::Concurrent);
        assert!(!settings.ignore_case());
        assert_eq!(settings.segments(), DEFAULT_SEGMENTS);
        assert!(!settings.invalidation());
    }

    #[test]
    fn test_builder_full() {
        let settings = CacheSettings::builder()
            .mode(SynchronizationMode::CoarseLock)
            .ignore_case(true)
            .segments(64)
            .invalidation(true)
            .build()
            .unwrap();

        assert_eq!(settings.mode(), SynchronizationMode::CoarseLock);
        assert!(settings.ignore_case());
        assert_eq!(settings.segments(), 64);
        assert!(settings.invalidation());
    }

    #[test]
    fn test_builder_rejects_bad_segments() {
        let error = CacheSettings::builder().segments(12).build().unwrap_err();
        assert!(matches!(error, CacheError::InvalidSettings(_)));

        assert!(CacheSettings::builder().segments(0).build().is_err());
    }

    #[test]
    fn test_from_json() {
        let settings = CacheSettings::from_json(
            r#"{"mode": "disabled", "segments": 4, "invalidation": true}"#,
        )
        .unwrap();

        assert_eq!(settings.mode(), SynchronizationMode::Disabled);
        assert_eq!(settings.segments(), 4);
        assert!(settings.invalidation());
        assert!(!settings.ignore_case());
    }

    #[test]
    fn test_from_yaml_empty_document_uses_defaults() {
        let settings = CacheSettings::from_yaml("{}").unwrap();
        assert_eq!(settings, CacheSettings::default());
    }

    #[test]
    fn test_unknown_mode_is_invalid() {
        let error = CacheSettings::from_json(r#"{"mode": "eventual"}"#).unwrap_err();
        assert!(error.to_string().contains("invalid cache settings"));
    }

    #[test]
    fn test_parsed_segments_are_validated() {
        let error = CacheSettings::from_yaml("segments: 3").unwrap_err();
        assert!(error.to_string().contains("power of two"));
    }

    #[test]
    fn test_json_roundtrip_uses_camel_case() {
        let settings = CacheSettings::builder()
            .mode(SynchronizationMode::LazyLock)
            .ignore_case(true)
            .build()
            .unwrap();

        let json = settings.to_json().unwrap();
        assert!(json.contains("\"ignoreCase\": true"));
        assert!(json.contains("\"lazyLock\""));
        assert_eq!(CacheSettings::from_json(&json).unwrap(), settings);
    }
}
