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

//! Module writing cell images and the coordinate table
//! used by map overlay viewers.

use super::{
    catalog::GridCell,
    rainfall::RainfallSample,
    render,
};
use crate::{constants::TABLE_HEADER, errors::ExportError, Float};
use image::{ImageFormat, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};

/// Renders and saves one `<id without dots>.png` per cell.
///
/// Returns paths of written images in the order of `cells`.
/// Stops at the first cell which cannot be written, images of
/// previous cells stay in place.
pub fn export(
    cells: &[GridCell],
    samples: &[RainfallSample],
    out_dir: &Path,
    scale: u32,
) -> Result<Vec<PathBuf>, ExportError> {
    let cells_bar = ProgressBar::new(cells.len() as u64);
    cells_bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    cells_bar.set_prefix("Rendered cells");

    let mut written = Vec::with_capacity(cells.len());

    for cell in cells {
        let img = render_cell(cell, samples, scale)?;
        let path = out_dir.join(format!("{}.png", cell.file_stem()));

        save_png(&img, &path, &cell.id)?;
        debug!("Cell {} saved to {}", cell.id, path.display());

        written.push(path);
        cells_bar.inc(1);
    }

    cells_bar.finish_with_message("All cells rendered");

    Ok(written)
}

/// Renders values of a single cell, keeping their dump order.
pub fn render_cell(
    cell: &GridCell,
    samples: &[RainfallSample],
    scale: u32,
) -> Result<RgbImage, ExportError> {
    if cell.resolution == 0 {
        return Err(ExportError::ZeroResolution(cell.id.clone()));
    }

    if render::side(cell.resolution, scale).is_none() {
        return Err(ExportError::TooLarge(format!("cell {}", cell.id)));
    }

    let values: Vec<Float> = samples
        .iter()
        .filter(|s| s.id == cell.id)
        .map(|s| s.value)
        .collect();

    if values.is_empty() {
        warn!("Cell {} has no values, its image will be blank", cell.id);
    }

    Ok(render::render(cell.resolution, values, scale))
}

/// Writes the PNG next to its target and moves it into place,
/// so a failed write never leaves a truncated image.
fn save_png(img: &RgbImage, path: &Path, id: &str) -> Result<(), ExportError> {
    let partial = path.with_extension("png.part");

    if let Err(source) = img.save_with_format(&partial, ImageFormat::Png) {
        let _ = fs::remove_file(&partial);
        return Err(ExportError::Image {
            id: id.to_string(),
            source,
        });
    }

    fs::rename(&partial, path).map_err(|source| {
        let _ = fs::remove_file(&partial);
        ExportError::Rename {
            id: id.to_string(),
            source,
        }
    })
}

/// Writes the table of cell corners with a constant opacity.
pub fn save_table(cells: &[GridCell], opacity: Float, path: &Path) -> Result<(), ExportError> {
    let mut out_file = csv::Writer::from_path(path)?;

    out_file.write_record(&TABLE_HEADER)?;

    for cell in cells {
        out_file.write_record(&[
            cell.file_stem(),
            cell.lat1.to_string(),
            cell.lon1.to_string(),
            cell.lat2.to_string(),
            cell.lon2.to_string(),
            opacity.to_string(),
        ])?;
    }

    out_file.flush()?;

    Ok(())
}

/// Composes cell images into one image.
///
/// Every distinct `lat1` is a row, north on top, and every distinct `lon1`
/// is a column, west on the left. Each cell is pasted into the slot of its
/// corner, slots without a cell stay black. Slots are as large as the
/// largest cell image.
pub fn save_mosaic(
    cells: &[GridCell],
    samples: &[RainfallSample],
    scale: u32,
    path: &Path,
) -> Result<(), ExportError> {
    if cells.is_empty() {
        warn!("No cells to compose, mosaic is not written");
        return Ok(());
    }

    let rows = distinct(cells.iter().map(|c| c.lat1), |a, b| b.total_cmp(a));
    let columns = distinct(cells.iter().map(|c| c.lon1), |a, b| a.total_cmp(b));

    let mut slot = 0;
    for cell in cells {
        let side = render::side(cell.resolution, scale)
            .ok_or_else(|| ExportError::TooLarge(format!("cell {}", cell.id)))?;
        slot = slot.max(side);
    }

    let too_large = || ExportError::TooLarge("mosaic".to_string());
    let mut mosaic = render::canvas(
        u32::try_from(columns.len()).map_err(|_| too_large())?,
        u32::try_from(rows.len()).map_err(|_| too_large())?,
        slot,
    )
    .ok_or_else(too_large)?;

    debug!(
        "Composing {} cell(s) into {} row(s) and {} column(s)",
        cells.len(),
        rows.len(),
        columns.len()
    );

    for cell in cells {
        let img = render_cell(cell, samples, scale)?;

        let row = slot_of(&rows, cell.lat1);
        let column = slot_of(&columns, cell.lon1);

        if let (Some(column), Some(row)) = (column, row) {
            render::paste(&mut mosaic, &img, column, row, slot);
        }
    }

    mosaic
        .save_with_format(path, ImageFormat::Png)
        .map_err(ExportError::Mosaic)
}

fn distinct<F>(values: impl Iterator<Item = Float>, order: F) -> Vec<Float>
where
    F: Fn(&Float, &Float) -> Ordering,
{
    let mut values: Vec<Float> = values.collect();
    values.sort_by(order);
    values.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    values
}

fn slot_of(axis: &[Float], value: Float) -> Option<u32> {
    axis.iter()
        .position(|v| v.total_cmp(&value) == Ordering::Equal)
        .and_then(|i| u32::try_from(i).ok())
}
