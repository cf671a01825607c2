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

//! Module containing constants used by the pipeline.

use crate::Float;

/// Rainfall intensity legend (mm/h) of the JMA nowcast,
/// as `(inclusive lower bound, hex color)` from the highest bucket down.
///
/// Values below the last bound (and NaN) use [`RAIN_BELOW_LEGEND`].
/// <https://www.jma.go.jp/jp/kaikotan/>
pub const RAIN_LEGEND: [(Float, &str); 7] = [
    (80.0, "#a62366"),
    (50.0, "#ec3d25"),
    (30.0, "#f29d39"),
    (20.0, "#fdf451"),
    (10.0, "#133cf5"),
    (5.0, "#418cf7"),
    (1.0, "#aad1fb"),
];

///Color of values below 1 mm/h
pub const RAIN_BELOW_LEGEND: &str = "#f2f2fe";

///Default opacity written to the coordinate table
pub const DEFAULT_OPACITY: Float = 0.8;

///Largest accepted image magnification
pub const MAX_SCALE: u32 = 64;

///Default decoder timeout in seconds
pub const DEFAULT_DECODER_TIMEOUT: u64 = 300;

///Header of the coordinate table
pub const TABLE_HEADER: [&str; 6] = ["id", "lat1", "lon1", "lat2", "lon2", "opacity"];

///Decoder flag printing the grid description
pub const GRID_FLAG: &str = "-grid";

///Decoder flags dumping one message as CSV to stdout
pub const DUMP_FLAG: &str = "-d";
pub const CSV_STDOUT_FLAGS: [&str; 2] = ["-csv", "-"];
