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

//! Module drawing grid cell values as images.
//!
//! The decoder prints cell values row by row starting from the south,
//! so rows are flipped to put the north on top of the image.
//! Placement follows the layout of already published overlays pixel
//! for pixel, including the shift of the last value in every row to the
//! first column.

pub mod colors;

use crate::Float;
use image::{imageops, ImageBuffer, RgbImage};

/// Position `(x, y)` of the `index`-th value in a cell of given resolution.
///
/// `None` when the value falls outside of the image, which happens
/// for odd resolutions and for values beyond `resolution^2`.
pub fn pixel_position(index: usize, resolution: u32) -> Option<(u32, u32)> {
    if resolution == 0 {
        return None;
    }

    let res = i64::from(resolution);
    let i = index as i64;
    let half = res / 2;

    let x = (i + 1) % res;
    let row = i / res;
    let y = (row - (half - 1)) * -1 + half;

    if (0..res).contains(&y) {
        Some((x as u32, y as u32))
    } else {
        None
    }
}

/// Side in pixels of a cell image, `None` when it does not fit in `u32`.
pub fn side(resolution: u32, scale: u32) -> Option<u32> {
    resolution.checked_mul(scale.max(1))
}

/// Draws cell values into a `resolution * scale` square image.
///
/// Pixels without a value stay black. Upscaling repeats every
/// pixel in a `scale x scale` block without any smoothing.
/// The caller checks the side with [`side`].
pub fn render<I>(resolution: u32, values: I, scale: u32) -> RgbImage
where
    I: IntoIterator<Item = Float>,
{
    let mut img: RgbImage = ImageBuffer::new(resolution, resolution);

    for (i, value) in values.into_iter().enumerate() {
        if let Some((x, y)) = pixel_position(i, resolution) {
            img.put_pixel(x, y, colors::color_of(value));
        }
    }

    upscale(&img, scale)
}

fn upscale(img: &RgbImage, scale: u32) -> RgbImage {
    if scale <= 1 {
        return img.clone();
    }

    ImageBuffer::from_fn(img.width() * scale, img.height() * scale, |x, y| {
        *img.get_pixel(x / scale, y / scale)
    })
}

/// Black canvas of `columns x rows` square slots with side `slot`.
///
/// `None` when the canvas does not fit in `u32` pixels.
pub fn canvas(columns: u32, rows: u32, slot: u32) -> Option<RgbImage> {
    let width = columns.checked_mul(slot)?;
    let height = rows.checked_mul(slot)?;

    Some(ImageBuffer::new(width, height))
}

/// Pastes `tile` at the top-left corner of slot `(column, row)`.
/// Parts of the tile outside of the canvas are clipped.
pub fn paste(canvas: &mut RgbImage, tile: &RgbImage, column: u32, row: u32, slot: u32) {
    let x = i64::from(column) * i64::from(slot);
    let y = i64::from(row) * i64::from(slot);

    imageops::replace(canvas, tile, x, y);
}
