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

//! Module selecting grid cells around a location
//! and attaching forecast labels to them.

use super::{
    catalog::GridCell,
    configuration::Search,
    decoder::Decoder,
    forecast::{self, ForecastHorizon},
};
use crate::{errors::PipelineError, Float};
use log::{debug, warn};
use rustc_hash::FxHashMap;

/// Grid cell with its forecast label, if the inventory has one.
#[derive(Clone, PartialEq, Debug)]
pub struct LabelledCell {
    pub cell: GridCell,
    pub label: Option<String>,
}

impl LabelledCell {
    pub fn horizon(&self) -> Option<ForecastHorizon> {
        self.label.as_deref().and_then(|label| label.parse().ok())
    }
}

/// Selects cells intersecting the square window of half-width `margin`
/// around `(lat, lon)`.
///
/// Each corner is tested against the center and both window edges.
/// The decoder does not guarantee which corner comes first, so every
/// axis is also tested with its corners swapped. For cells printed
/// north-west first the swapped test never adds a cell.
/// An infinite margin selects every cell.
pub fn select(cells: &[GridCell], lat: Float, lon: Float, margin: Float) -> Vec<GridCell> {
    cells
        .iter()
        .filter(|cell| intersects(cell, lat, lon, margin))
        .cloned()
        .collect()
}

fn intersects(cell: &GridCell, lat: Float, lon: Float, margin: Float) -> bool {
    let lat_hit = |north: Float, south: Float| {
        exceeds(north, lat, margin) && exceeds(-south, -lat, margin)
    };
    let lon_hit = |west: Float, east: Float| {
        exceeds(-west, -lon, margin) && exceeds(east, lon, margin)
    };

    (lat_hit(cell.lat1, cell.lat2) || lat_hit(cell.lat2, cell.lat1))
        && (lon_hit(cell.lon1, cell.lon2) || lon_hit(cell.lon2, cell.lon1))
}

/// Three-point test: `value` lies above the center or either window edge.
fn exceeds(value: Float, center: Float, margin: Float) -> bool {
    value > center || value > center + margin || value > center - margin
}

/// Left-joins forecast labels onto cells by id.
pub fn join_labels(cells: Vec<GridCell>, labels: &FxHashMap<String, String>) -> Vec<LabelledCell> {
    cells
        .into_iter()
        .map(|cell| {
            let label = labels.get(&cell.id).cloned();
            LabelledCell { cell, label }
        })
        .collect()
}

/// Selects cells in the search window, reads the inventory
/// and keeps cells of the requested forecast horizon.
///
/// Empty results are reported in log only; they are
/// not an error of the decoder output.
pub fn labelled_cells(
    cells: &[GridCell],
    window: &Search,
    decoder: &dyn Decoder,
) -> Result<Vec<LabelledCell>, PipelineError> {
    let selected = select(cells, window.lat, window.lon, window.margin);
    debug!(
        "Selected {} of {} cells around ({}, {}) with margin {}",
        selected.len(),
        cells.len(),
        window.lat,
        window.lon,
        window.margin
    );

    if selected.is_empty() {
        warn!("No grid cells intersect the search window");
        return Ok(vec![]);
    }

    let labels = forecast::parse(&decoder.inventory()?)?;
    let mut labelled = join_labels(selected, &labels);

    if labelled.iter().all(|c| c.label.is_none()) {
        warn!("Inventory has no forecast labels for the selected cells");
    }

    if let Some(horizon) = window.forecast {
        labelled.retain(|c| c.horizon() == Some(horizon));

        if labelled.is_empty() {
            warn!("No selected cells with forecast {}", horizon);
        }
    }

    Ok(labelled)
}

#[cfg(test)]
mod tests {
    use super::{join_labels, labelled_cells, select};
    use crate::pipeline::{
        catalog::GridCell,
        configuration::Search,
        decoder::tests::CannedDecoder,
        forecast::ForecastHorizon,
    };
    use rustc_hash::FxHashMap;

    fn cell(id: &str, lat: (f64, f64), lon: (f64, f64)) -> GridCell {
        GridCell {
            id: id.to_string(),
            resolution: 40,
            lat1: lat.0,
            lon1: lon.0,
            lat2: lat.1,
            lon2: lon.1,
        }
    }

    fn swapped_lat(c: &GridCell) -> GridCell {
        GridCell {
            lat1: c.lat2,
            lat2: c.lat1,
            ..c.clone()
        }
    }

    fn swapped_lon(c: &GridCell) -> GridCell {
        GridCell {
            lon1: c.lon2,
            lon2: c.lon1,
            ..c.clone()
        }
    }

    fn ids(cells: &[GridCell]) -> Vec<&str> {
        cells.iter().map(|c| c.id.as_str()).collect()
    }

    fn sample_cells() -> Vec<GridCell> {
        vec![
            cell("1.1", (36.0, 35.35), (138.0, 139.0)),
            cell("2.1", (36.0, 35.35), (139.0, 140.0)),
            cell("3.1", (43.0, 42.35), (141.0, 142.0)),
            cell("4.1", (26.0, 25.35), (127.0, 128.0)),
        ]
    }

    #[test]
    fn window_selection() {
        let cells = sample_cells();
        let selected = select(&cells, 35.68, 139.76, 0.1);

        assert_eq!(ids(&selected), vec!["2.1"]);
    }

    #[test]
    fn infinite_margin_selects_all() {
        let cells = sample_cells();
        let mut mixed: Vec<GridCell> = cells.iter().map(swapped_lat).collect();
        mixed.extend(cells.iter().map(swapped_lon));

        assert_eq!(select(&cells, 35.68, 139.76, f64::INFINITY), cells);
        assert_eq!(select(&mixed, 0.0, 0.0, f64::INFINITY).len(), mixed.len());
    }

    #[test]
    fn invariant_under_corner_swap() {
        let cells = sample_cells();

        for margin in [0.0, 0.1, 0.5, 3.0, 20.0] {
            for (lat, lon) in [(35.68, 139.76), (42.5, 141.5), (26.2, 127.7), (0.0, 0.0)] {
                let expected = select(&cells, lat, lon, margin);

                let by_lat: Vec<GridCell> = cells.iter().map(swapped_lat).collect();
                let by_lon: Vec<GridCell> = cells.iter().map(swapped_lon).collect();

                assert_eq!(ids(&select(&by_lat, lat, lon, margin)), ids(&expected));
                assert_eq!(ids(&select(&by_lon, lat, lon, margin)), ids(&expected));
            }
        }
    }

    #[test]
    fn labels_left_join() {
        let mut labels = FxHashMap::default();
        labels.insert("1.1".to_string(), "anl".to_string());

        let joined = join_labels(sample_cells(), &labels);

        assert_eq!(joined.len(), 4);
        assert_eq!(joined[0].label.as_deref(), Some("anl"));
        assert_eq!(joined[0].horizon(), Some(ForecastHorizon::Analysis));
        assert!(joined[1..].iter().all(|c| c.label.is_none()));
    }

    #[test]
    fn labelled_selection_with_horizon() {
        let decoder = CannedDecoder {
            inventory: "1.1:0:d=2021070100:APCP:surface:anl:\n\
                        2.1:0:d=2021070100:APCP:surface:5 min fcst:\n"
                .to_string(),
            ..CannedDecoder::default()
        };

        let window = Search {
            lat: 35.68,
            lon: 139.0,
            margin: 0.5,
            forecast: Some(ForecastHorizon::Min5),
        };

        let cells = labelled_cells(&sample_cells(), &window, &decoder).unwrap();

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].cell.id, "2.1");
        assert_eq!(cells[0].label.as_deref(), Some("5 min fcst"));
    }

    #[test]
    fn empty_selection_is_not_an_error() {
        let decoder = CannedDecoder::default();
        let window = Search {
            lat: -60.0,
            lon: 0.0,
            margin: 0.1,
            forecast: None,
        };

        assert!(labelled_cells(&sample_cells(), &window, &decoder)
            .unwrap()
            .is_empty());
    }
}
