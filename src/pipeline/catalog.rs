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

//! Module parsing the grid description printed by `wgrib2 <file> -grid`.
//!
//! Each grid cell (GRIB message) is described by a block of four lines:
//!
//! ```text
//! 1.1:0:grid_template=0:winds(N/S):
//! 	lat-lon grid:(40 x 40) units 1e-06 input WE:NS output WE:SN res 48
//! 	lat 36.000000 to 35.350000 by 0.016667
//! 	lon 138.000000 to 138.975000 by 0.025000 #points=1600
//! ```

use crate::{errors::FormatError, Float};
use regex::Regex;
use std::str::FromStr;

const GRID_PATTERN: &str = concat!(
    r"(.*):0:grid_template=0:winds\(N/S\):\n",
    r".*lat-lon grid:\((.*) x .*\) units 1e-06 input WE:NS output WE:SN res .*\n",
    r".*lat (.*) to (.*) by .*\n",
    r".*lon (.*) to (.*) by .* #points=.*",
);

/// Single grid cell of the decoded file.
///
/// `(lat1, lon1)` is nominally the north-west corner and `(lat2, lon2)`
/// the south-east one, but the decoder does not guarantee that order.
#[derive(Clone, PartialEq, PartialOrd, Debug)]
pub struct GridCell {
    pub id: String,
    /// Cell side in pixels, 40 means 40x40 values.
    pub resolution: u32,
    pub lat1: Float,
    pub lon1: Float,
    pub lat2: Float,
    pub lon2: Float,
}

impl GridCell {
    /// Cell id usable as a file name.
    pub fn file_stem(&self) -> String {
        self.id.replace('.', "")
    }
}

/// Parses every cell block found in the grid description.
///
/// Text without any block gives an empty vector.
pub fn parse(grid_description: &str) -> Result<Vec<GridCell>, FormatError> {
    let pattern = Regex::new(GRID_PATTERN)?;

    pattern
        .captures_iter(grid_description)
        .map(|caps| {
            let block = &caps[0];

            Ok(GridCell {
                id: caps[1].to_string(),
                resolution: parse_field(&caps[2], "resolution", block)?,
                lat1: parse_field(&caps[3], "lat1", block)?,
                lat2: parse_field(&caps[4], "lat2", block)?,
                lon1: parse_field(&caps[5], "lon1", block)?,
                lon2: parse_field(&caps[6], "lon2", block)?,
            })
        })
        .collect()
}

/// Same as [`parse`] but treats non-empty text without
/// any cell block as a decoder format mismatch.
pub fn parse_checked(grid_description: &str) -> Result<Vec<GridCell>, FormatError> {
    let cells = parse(grid_description)?;

    if cells.is_empty() && !grid_description.trim().is_empty() {
        return Err(FormatError::NoGridCells);
    }

    Ok(cells)
}

fn parse_field<T: FromStr>(raw: &str, field: &'static str, block: &str) -> Result<T, FormatError> {
    raw.trim().parse().map_err(|_| FormatError::GridField {
        field,
        line: block.to_string(),
    })
}
