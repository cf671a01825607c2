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

//! Rainfall intensity color scale.

use crate::constants::{RAIN_BELOW_LEGEND, RAIN_LEGEND};
use crate::Float;
use image::Rgb;

/// Hex color of the legend bucket containing `value`.
///
/// Buckets are scanned from the heaviest rainfall down and the
/// first bound met or exceeded wins. NaN ends in the lowest bucket.
pub fn hex_of(value: Float) -> &'static str {
    RAIN_LEGEND
        .iter()
        .find(|(bound, _)| value >= *bound)
        .map_or(RAIN_BELOW_LEGEND, |&(_, hex)| hex)
}

/// RGB color of the legend bucket containing `value`.
pub fn color_of(value: Float) -> Rgb<u8> {
    hex_to_rgb(hex_of(value))
}

fn hex_to_rgb(hex: &str) -> Rgb<u8> {
    let hex = hex.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0)
    };

    Rgb([channel(0), channel(2), channel(4)])
}
