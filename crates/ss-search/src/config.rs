use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ss_region::{Connectivity, GrowConfig};

pub const GENERAL_SECTION: &str = "general";
pub const SEARCH_SECTION: &str = "peak_search";
pub const GROW_SECTION: &str = "grow";

/// Peak search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of beams spread over the field of view.
    pub n_beams: usize,
    /// Bins skipped between the sonar apex and the first sampled bin.
    pub start_bin: usize,
    /// Minimum height above the background mean for a bin to be in a peak.
    pub h_min: i32,
    /// Angular aperture of the fan, in degrees.
    pub field_of_view_deg: f32,
    /// Rows between the bottom image edge and the sonar apex.
    pub sonar_vertical_offset: i32,
    /// Segments with fewer pixels are discarded.
    pub min_sample_size: usize,
    /// Background bins averaged for the running mean; zero disables it.
    pub mean_window_size: usize,
    /// Initial capacity of the per-image peak list.
    pub peak_capacity_hint: usize,
    /// Stop each beam at its first bin outside the image instead of failing.
    pub clip_beams_to_image: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_beams: 720,
            start_bin: 20,
            h_min: 110,
            field_of_view_deg: 130.0,
            sonar_vertical_offset: 1,
            min_sample_size: 10,
            mean_window_size: 5,
            peak_capacity_hint: 3000,
            clip_beams_to_image: false,
        }
    }
}

/// Keyed configuration lookups. `None` means the key is absent.
pub trait ConfigSource {
    fn get_int(&self, section: &str, key: &str) -> Option<i64>;

    fn get_float(&self, section: &str, key: &str) -> Option<f64>;
}

impl SearchConfig {
    /// Overrides the fields whose keys are present in `src`.
    ///
    /// `peak_search.min_sample_size` takes precedence over
    /// `general.min_sample_size`.
    pub fn load(&mut self, src: &impl ConfigSource) {
        load_int(src, GENERAL_SECTION, "min_sample_size", &mut self.min_sample_size);
        load_int(
            src,
            SEARCH_SECTION,
            "sonar_vertical_offset",
            &mut self.sonar_vertical_offset,
        );
        load_int(src, SEARCH_SECTION, "min_sample_size", &mut self.min_sample_size);
        load_int(src, SEARCH_SECTION, "n_beams", &mut self.n_beams);
        load_int(src, SEARCH_SECTION, "start_bin", &mut self.start_bin);
        load_int(src, SEARCH_SECTION, "h_min", &mut self.h_min);
        if let Some(v) = src.get_float(SEARCH_SECTION, "field_of_view_deg") {
            tracing::debug!("config {}.field_of_view_deg = {}", SEARCH_SECTION, v);
            self.field_of_view_deg = v as f32;
        }
        load_int(src, SEARCH_SECTION, "mean_window_size", &mut self.mean_window_size);
        load_int(
            src,
            SEARCH_SECTION,
            "peak_capacity_hint",
            &mut self.peak_capacity_hint,
        );
        if let Some(v) = src.get_int(SEARCH_SECTION, "clip_beams_to_image") {
            self.clip_beams_to_image = v != 0;
        }
    }
}

/// Overrides `cfg` from the `grow` section of `src`.
pub fn load_grow_config(cfg: &mut GrowConfig, src: &impl ConfigSource) {
    load_int(src, GROW_SECTION, "max_gap_px", &mut cfg.max_gap_px);
    match src.get_int(GROW_SECTION, "connectivity") {
        None => {}
        Some(4) => cfg.connectivity = Connectivity::C4,
        Some(8) => cfg.connectivity = Connectivity::C8,
        Some(other) => tracing::warn!(
            "config {}.connectivity = {} is not 4 or 8; keeping {:?}",
            GROW_SECTION,
            other,
            cfg.connectivity
        ),
    }
}

fn load_int<T>(src: &impl ConfigSource, section: &str, key: &str, dst: &mut T)
where
    T: TryFrom<i64> + fmt::Debug,
{
    let Some(raw) = src.get_int(section, key) else {
        return;
    };
    match T::try_from(raw) {
        Ok(v) => {
            tracing::debug!("config {}.{} = {}", section, key, raw);
            *dst = v;
        }
        Err(_) => tracing::warn!(
            "config {}.{} = {} is out of range; keeping {:?}",
            section,
            key,
            raw,
            dst
        ),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, .. } => write!(f, "reading config {}", path.display()),
            Self::Parse(_) => write!(f, "parsing config json"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
        }
    }
}

/// [`ConfigSource`] over a JSON document of `{ "section": { "key": value } }`.
#[derive(Debug, Clone, Default)]
pub struct JsonConfigSource {
    root: serde_json::Value,
}

impl JsonConfigSource {
    pub fn from_value(root: serde_json::Value) -> Self {
        Self { root }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&serde_json::Value> {
        self.root.get(section)?.get(key)
    }
}

impl FromStr for JsonConfigSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
            .map(Self::from_value)
            .map_err(ConfigError::Parse)
    }
}

impl ConfigSource for JsonConfigSource {
    fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        let v = self.lookup(section, key)?;
        v.as_i64().or_else(|| v.as_bool().map(i64::from))
    }

    fn get_float(&self, section: &str, key: &str) -> Option<f64> {
        self.lookup(section, key)?.as_f64()
    }
}
