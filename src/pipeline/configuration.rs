/*
Copyright 2021 Jakub Lewandowski

This file is part of Rainfall Grid Renderer (RGR).

Rainfall Grid Renderer (RGR) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Rainfall Grid Renderer (RGR) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Rainfall Grid Renderer (RGR). If not, see https://www.gnu.org/licenses/.
*/

//! Module responsible for parsing and checking the configuration file.
//!
//! To provide meaningful error messages. The configuration file uses
//! [YAML](https://en.wikipedia.org/wiki/YAML) and `serde` to enforce
//! strong typing and automatic type checking.
//!
//! The structures and their fields in this module directly correspond to
//! the fields inside `config.yaml` so you can check this documentation
//! for more details how to set the config file.

use super::forecast::ForecastHorizon;
use crate::constants::{DEFAULT_DECODER_TIMEOUT, DEFAULT_OPACITY, MAX_SCALE};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::Float;

/// Fields with information about the decoder executable.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Decoder {
    /// Path to the `wgrib2` executable.
    pub path: PathBuf,

    /// _(Optional)_ Time (in seconds) after which a single decoder
    /// call is killed and reported as failed.
    ///
    /// Cannot be less than `1`. Defaults to `300`.
    #[serde(default = "Decoder::default_timeout")]
    pub timeout: u64,
}

impl Decoder {
    fn default_timeout() -> u64 {
        DEFAULT_DECODER_TIMEOUT
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.timeout < 1 {
            return Err(ConfigError::OutOfBounds(
                "Decoder timeout cannot be less than 1 second",
            ));
        }

        Ok(())
    }
}

/// Fields with information about input data.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Input {
    /// GRIB2 file with gridded rainfall, passed to the decoder as is.
    pub data_file: PathBuf,
}

/// _(Optional)_ Search window around a location.
///
/// When the whole section is omitted all grid cells are rendered.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize)]
pub struct Search {
    /// Latitude (in degrees) of the window center.
    ///
    /// Must meet the condition: `-90 <= lat <= 90`
    pub lat: Float,

    /// Longitude (in degrees) of the window center.
    ///
    /// Must meet the condition: `-180 <= lon <= 360`
    pub lon: Float,

    /// _(Optional)_ Half-width of the window (in degrees).
    ///
    /// Cannot be negative. Defaults to infinity, which selects every cell.
    #[serde(default = "Search::default_margin")]
    pub margin: Float,

    /// _(Optional)_ Render only cells with this forecast horizon,
    /// eg. `anl` or `30 min fcst`.
    #[serde(default)]
    pub forecast: Option<ForecastHorizon>,
}

impl Search {
    fn default_margin() -> Float {
        Float::INFINITY
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ConfigError::OutOfBounds(
                "Search latitude is too low or too high",
            ));
        }

        if !(-180.0..=360.0).contains(&self.lon) {
            return Err(ConfigError::OutOfBounds(
                "Search longitude is too low or too high",
            ));
        }

        if self.margin.is_nan() || self.margin < 0.0 {
            return Err(ConfigError::OutOfBounds("Search margin cannot be negative"));
        }

        Ok(())
    }
}

impl Default for Search {
    fn default() -> Self {
        Search {
            lat: 0.0,
            lon: 0.0,
            margin: Search::default_margin(),
            forecast: None,
        }
    }
}

/// _(Optional)_ Fields with information about produced files.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Output {
    /// _(Optional)_ Directory for cell images.
    ///
    /// Defaults to `./map`.
    #[serde(default = "Output::default_directory")]
    pub directory: PathBuf,

    /// _(Optional)_ Path of the coordinate table.
    ///
    /// Defaults to `out.csv` inside the output directory.
    #[serde(default)]
    pub table: Option<PathBuf>,

    /// _(Optional)_ Image magnification. With `1` each
    /// decoded value is one pixel.
    ///
    /// Must be within `1..=64`. Defaults to `1`.
    #[serde(default = "Output::default_scale")]
    pub scale: u32,

    /// _(Optional)_ Opacity written to the coordinate table
    /// for map overlay viewers.
    ///
    /// Must be within `0..=1`. Defaults to `0.8`.
    #[serde(default = "Output::default_opacity")]
    pub opacity: Float,

    /// _(Optional)_ Also compose all cell images into `mosaic.png`.
    ///
    /// Defaults to `false`.
    #[serde(default)]
    pub mosaic: bool,
}

impl Output {
    fn default_directory() -> PathBuf {
        PathBuf::from("./map")
    }

    fn default_scale() -> u32 {
        1
    }

    fn default_opacity() -> Float {
        DEFAULT_OPACITY
    }

    /// Path of the coordinate table, resolving the default.
    pub fn table_path(&self) -> PathBuf {
        self.table
            .clone()
            .unwrap_or_else(|| self.directory.join("out.csv"))
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.scale < 1 {
            return Err(ConfigError::OutOfBounds(
                "Image scale cannot be less than 1",
            ));
        }

        if self.scale > MAX_SCALE {
            return Err(ConfigError::OutOfBounds(
                "Image scale cannot be greater than 64",
            ));
        }

        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ConfigError::OutOfBounds("Opacity must be between 0 and 1"));
        }

        Ok(())
    }
}

impl Default for Output {
    fn default() -> Self {
        Output {
            directory: Output::default_directory(),
            table: None,
            scale: Output::default_scale(),
            opacity: Output::default_opacity(),
            mosaic: false,
        }
    }
}

/// _(Optional)_ Fields with information about
/// resources available for the program.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Resources {
    /// _(Optional)_ Thread count used for dumping cells.
    /// Each thread runs one decoder process at a time.
    ///
    /// Cannot be less than `1`. Defaults to `1`.
    #[serde(default = "Resources::default_threads")]
    pub threads: u16,

    /// _(Optional)_ Heap memory limit for the program in MB.
    /// Useful for enabling meaningful Out-of-memory error messages
    /// when very large grids are dumped.
    ///
    /// Cannot be less than `128`. Defaults to whole addressable-space
    /// (`2^32` or `2^64` bytes).
    #[serde(default = "Resources::default_memory")]
    pub memory: usize,
}

impl Resources {
    fn default_threads() -> u16 {
        1
    }

    fn default_memory() -> usize {
        usize::MAX / (1024 * 1024)
    }

    /// Checks if thread count and memory limit are
    /// above limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.threads < 1 {
            return Err(ConfigError::OutOfBounds(
                "Available threads cannot be less than 1",
            ));
        }

        if self.memory < 128 {
            return Err(ConfigError::OutOfBounds(
                "Available memory cannot be less than 128 MB",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            threads: Resources::default_threads(),
            memory: Resources::default_memory(),
        }
    }
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Config {
    pub decoder: Decoder,

    pub input: Input,

    #[serde(default)]
    pub search: Option<Search>,

    #[serde(default)]
    pub output: Output,

    #[serde(default)]
    pub resources: Resources,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        Config::new_from_slice(data.as_slice())
    }

    fn new_from_slice(data: &[u8]) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_slice(data)?;

        config.decoder.check_bounds()?;
        if let Some(search) = &config.search {
            search.check_bounds()?;
        }
        config.output.check_bounds()?;
        config.resources.check_bounds()?;

        Ok(config)
    }

    /// Search window to use, the whole grid when none is configured.
    pub fn search_window(&self) -> Search {
        self.search.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::errors::ConfigError;
    use crate::pipeline::forecast::ForecastHorizon;
    use std::path::{Path, PathBuf};

    #[test]
    fn example_config() {
        let config = Config::new_from_file(Path::new("./config.example.yaml")).unwrap();

        assert_eq!(config.decoder.path, PathBuf::from("./wgrib2"));
        assert_eq!(
            config.search_window().forecast,
            Some(ForecastHorizon::Analysis)
        );
        assert_eq!(config.output.scale, 4);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let yaml = "decoder:\n  path: ./wgrib2\ninput:\n  data_file: ./rain.bin\n";
        let config = Config::new_from_slice(yaml.as_bytes()).unwrap();

        assert_eq!(config.decoder.timeout, 300);
        assert_eq!(config.output.scale, 1);
        assert_eq!(config.output.table_path(), PathBuf::from("./map/out.csv"));
        assert_eq!(config.resources.threads, 1);
        assert!(config.search.is_none());
        assert!(config.search_window().margin.is_infinite());
    }

    #[test]
    fn full_config() {
        let yaml = r#"
decoder:
  path: /usr/local/bin/wgrib2
  timeout: 10
input:
  data_file: ./rain.bin
search:
  lat: 35.68
  lon: 139.76
  margin: 0.5
  forecast: 30 min fcst
output:
  directory: ./out
  table: ./out/cells.csv
  scale: 4
  opacity: 0.5
  mosaic: true
resources:
  threads: 4
"#;
        let config = Config::new_from_slice(yaml.as_bytes()).unwrap();
        let search = config.search_window();

        assert_eq!(search.margin, 0.5);
        assert_eq!(search.forecast, Some(ForecastHorizon::Min30));
        assert_eq!(config.output.table_path(), PathBuf::from("./out/cells.csv"));
        assert_eq!(config.output.scale, 4);
        assert!(config.output.mosaic);
        assert_eq!(config.resources.threads, 4);
    }

    #[test]
    fn out_of_bounds() {
        let yaml = "decoder:\n  path: ./wgrib2\ninput:\n  data_file: ./rain.bin\noutput:\n  scale: 0\n";
        let result = Config::new_from_slice(yaml.as_bytes());
        assert!(matches!(result, Err(ConfigError::OutOfBounds(_))));

        let yaml = "decoder:\n  path: ./wgrib2\ninput:\n  data_file: ./rain.bin\noutput:\n  scale: 65\n";
        let result = Config::new_from_slice(yaml.as_bytes());
        assert!(matches!(result, Err(ConfigError::OutOfBounds(_))));

        let yaml = "decoder:\n  path: ./wgrib2\ninput:\n  data_file: ./rain.bin\noutput:\n  scale: 64\n";
        assert_eq!(Config::new_from_slice(yaml.as_bytes()).unwrap().output.scale, 64);

        let yaml = "decoder:\n  path: ./wgrib2\ninput:\n  data_file: ./rain.bin\nsearch:\n  lat: 95.0\n  lon: 139.0\n";
        let result = Config::new_from_slice(yaml.as_bytes());
        assert!(matches!(result, Err(ConfigError::OutOfBounds(_))));
    }

    #[test]
    fn missing_decoder() {
        let yaml = "input:\n  data_file: ./rain.bin\n";
        let result = Config::new_from_slice(yaml.as_bytes());
        assert!(matches!(result, Err(ConfigError::CantDeserialize(_))));
    }
}
