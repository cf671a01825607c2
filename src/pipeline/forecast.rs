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

//! Module reading forecast labels of grid cells from
//! the message inventory printed by `wgrib2 <file>`, eg.
//! `1.1:0:d=2021070100:APCP:surface:anl:`

use crate::errors::FormatError;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::{fmt, str::FromStr};

const INVENTORY_PATTERN: &str = r"(.*):0:.*:surface:(.*):";

/// Parses the inventory into a map from cell id to forecast label.
///
/// Lines not matching the inventory pattern are skipped.
pub fn parse(inventory: &str) -> Result<FxHashMap<String, String>, FormatError> {
    let pattern = Regex::new(INVENTORY_PATTERN)?;

    Ok(pattern
        .captures_iter(inventory)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect())
}

/// Forecast horizons present in the precipitation nowcast.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize)]
pub enum ForecastHorizon {
    #[serde(rename = "-5 min fcst")]
    MinMinus5,
    #[serde(rename = "anl")]
    Analysis,
    #[serde(rename = "5 min fcst")]
    Min5,
    #[serde(rename = "10 min fcst")]
    Min10,
    #[serde(rename = "15 min fcst")]
    Min15,
    #[serde(rename = "20 min fcst")]
    Min20,
    #[serde(rename = "25 min fcst")]
    Min25,
    #[serde(rename = "30 min fcst")]
    Min30,
    #[serde(rename = "35 min fcst")]
    Min35,
    #[serde(rename = "40 min fcst")]
    Min40,
    #[serde(rename = "45 min fcst")]
    Min45,
    #[serde(rename = "50 min fcst")]
    Min50,
    #[serde(rename = "55 min fcst")]
    Min55,
}

impl ForecastHorizon {
    pub const ALL: [ForecastHorizon; 13] = [
        ForecastHorizon::MinMinus5,
        ForecastHorizon::Analysis,
        ForecastHorizon::Min5,
        ForecastHorizon::Min10,
        ForecastHorizon::Min15,
        ForecastHorizon::Min20,
        ForecastHorizon::Min25,
        ForecastHorizon::Min30,
        ForecastHorizon::Min35,
        ForecastHorizon::Min40,
        ForecastHorizon::Min45,
        ForecastHorizon::Min50,
        ForecastHorizon::Min55,
    ];

    /// Label as printed by the decoder.
    pub fn label(self) -> &'static str {
        match self {
            ForecastHorizon::MinMinus5 => "-5 min fcst",
            ForecastHorizon::Analysis => "anl",
            ForecastHorizon::Min5 => "5 min fcst",
            ForecastHorizon::Min10 => "10 min fcst",
            ForecastHorizon::Min15 => "15 min fcst",
            ForecastHorizon::Min20 => "20 min fcst",
            ForecastHorizon::Min25 => "25 min fcst",
            ForecastHorizon::Min30 => "30 min fcst",
            ForecastHorizon::Min35 => "35 min fcst",
            ForecastHorizon::Min40 => "40 min fcst",
            ForecastHorizon::Min45 => "45 min fcst",
            ForecastHorizon::Min50 => "50 min fcst",
            ForecastHorizon::Min55 => "55 min fcst",
        }
    }
}

impl FromStr for ForecastHorizon {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ForecastHorizon::ALL
            .iter()
            .copied()
            .find(|horizon| horizon.label() == s)
            .ok_or_else(|| FormatError::UnknownForecast(s.to_string()))
    }
}

impl fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
