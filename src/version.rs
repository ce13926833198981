//! Release metadata and feature flags.
//!
//! Constructed once at startup and shared read-only; nothing mutates it after
//! `main` hands it to `AppState`.

use serde::Serialize;

pub const RELEASE_NAME: &str = "Enhanced Performance Update";
pub const RELEASE_DATE: &str = "2025-06-29";
pub const API_VERSION: &str = "v2.1";

/// Named capability flags advertised at `GET /version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeatureSet {
    pub streaming: bool,
    pub topography: bool,
    pub hand_interaction: bool,
    pub performance_monitoring: bool,
    pub camera_reset: bool,
    pub real_time_collaboration: bool,
}

impl FeatureSet {
    const NAMES: [&'static str; 6] = [
        "streaming",
        "topography",
        "hand_interaction",
        "performance_monitoring",
        "camera_reset",
        "real_time_collaboration",
    ];

    /// Look a flag up by name. Unknown names are disabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        match name {
            "streaming" => self.streaming,
            "topography" => self.topography,
            "hand_interaction" => self.hand_interaction,
            "performance_monitoring" => self.performance_monitoring,
            "camera_reset" => self.camera_reset,
            "real_time_collaboration" => self.real_time_collaboration,
            _ => false,
        }
    }

    #[must_use]
    pub fn enabled_count(&self) -> usize {
        Self::NAMES.iter().filter(|name| self.is_enabled(name)).count()
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            streaming: true,
            topography: true,
            hand_interaction: true,
            performance_monitoring: true,
            camera_reset: true,
            real_time_collaboration: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub release_name: &'static str,
    pub release_date: &'static str,
    pub api_version: &'static str,
    pub features: FeatureSet,
}

impl BuildInfo {
    /// Metadata for this build.
    #[must_use]
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            release_name: RELEASE_NAME,
            release_date: RELEASE_DATE,
            api_version: API_VERSION,
            features: FeatureSet::default(),
        }
    }

    /// One-line banner for startup logs.
    #[must_use]
    pub fn banner(&self) -> String {
        format!(
            "{} v{} ({}, {}) api={} features={}",
            self.name,
            self.version,
            self.release_name,
            self.release_date,
            self.api_version,
            self.features.enabled_count()
        )
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
