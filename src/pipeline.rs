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

//! Module containing the actual rendering pipeline.
//!
//! The pipeline runs in three stages:
//!
//! 1. The grid description of the input file is parsed into grid cells
//!    and cells around the configured location are selected.
//! 2. Rainfall values of every selected cell are dumped by the decoder,
//!    one decoder process per cell, on the thread pool.
//! 3. Values of each cell are drawn with the rainfall color scale and saved
//!    as an image, together with a table of cell corners.
//!
//! Cells whose dump fails are reported in the log and left out of the output.

mod catalog;
mod configuration;
mod decoder;
mod export;
mod forecast;
mod rainfall;
mod render;
mod selection;

use crate::{
    errors::PipelineError,
    pipeline::{
        catalog::GridCell,
        configuration::Config,
        decoder::{Decoder, Wgrib2},
        rainfall::RainfallSample,
    },
    Float, ALLOCATOR,
};
use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Main pipeline function, responsible for all rendering steps.
///
/// It reads the provided configuration, prepares the output
/// directory and runs all stages of the pipeline.
pub fn main(config_path: &Path) -> Result<(), PipelineError> {
    info!("Preparing the pipeline core");

    let core = Core::new(config_path)?;

    prepare_output_dir(&core.config.output.directory)?;

    let summary = run(&core)?;

    info!(
        "Rendered {} cell(s), {} cell(s) skipped",
        summary.images.len(),
        summary.failed.len()
    );
    if let Some(table) = &summary.table {
        info!("Coordinate table written to {}", table.display());
    }

    Ok(())
}

/// Structure containing pipeline prerequisites.
pub struct Core {
    pub config: Config,
    pub threadpool: ThreadPool,
    pub decoder: Arc<dyn Decoder>,
}

impl Core {
    /// Pipeline [`Core`] constructor.
    ///
    /// Configuration provided by the user must be loaded
    /// and checked before any decoder process is started.
    pub fn new(config_path: &Path) -> Result<Self, PipelineError> {
        debug!("Reading configuration from {}", config_path.display());
        let config = Config::new_from_file(config_path)?;

        debug!("Setting memory limit");
        ALLOCATOR
            .set_limit(config.resources.memory.saturating_mul(1024 * 1024))
            .map_err(|err| PipelineError::MemoryLimit(format!("{:?}", err)))?;

        let decoder = Arc::new(Wgrib2::new(&config));

        Core::with_decoder(config, decoder)
    }

    /// Constructor with an already prepared decoder.
    pub fn with_decoder(config: Config, decoder: Arc<dyn Decoder>) -> Result<Self, PipelineError> {
        debug!("Setting up ThreadPool");
        let threadpool = ThreadPoolBuilder::new()
            .num_threads(config.resources.threads as usize)
            .stack_size(2 * 1024 * 1024)
            .build()?;

        Ok(Core {
            config,
            threadpool,
            decoder,
        })
    }
}

/// Files written by a pipeline run.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Summary {
    pub images: Vec<PathBuf>,
    pub table: Option<PathBuf>,
    pub failed: Vec<String>,
}

/// Runs all pipeline stages with the core configuration.
pub fn run(core: &Core) -> Result<Summary, PipelineError> {
    info!("Reading grid description");
    let cells = catalog::parse_checked(&core.decoder.grid_description()?)?;
    info!("Found {} grid cell(s)", cells.len());

    let window = core.config.search_window();
    let labelled = selection::labelled_cells(&cells, &window, core.decoder.as_ref())?;

    if labelled.is_empty() {
        warn!("Nothing to render, check the search window in configuration");
        return Ok(Summary::default());
    }

    let ids: Vec<String> = labelled.iter().map(|c| c.cell.id.clone()).collect();

    info!("Dumping rainfall of {} cell(s)", ids.len());
    let extraction = rainfall::extract(&ids, &core.decoder, &core.threadpool);
    log_extent(&extraction.samples);
    let failed: Vec<String> = extraction
        .failed_ids()
        .into_iter()
        .map(String::from)
        .collect();

    let cells: Vec<GridCell> = labelled
        .into_iter()
        .map(|c| c.cell)
        .filter(|c| !failed.contains(&c.id))
        .collect();

    if cells.is_empty() {
        warn!("Dumping failed for every selected cell, nothing to render");
        return Ok(Summary {
            failed,
            ..Summary::default()
        });
    }

    let output = &core.config.output;

    info!("Writing output");
    let images = export::export(&cells, &extraction.samples, &output.directory, output.scale)?;

    let table = output.table_path();
    if let Some(parent) = table.parent() {
        fs::create_dir_all(parent)?;
    }
    export::save_table(&cells, output.opacity, &table)?;

    if output.mosaic {
        export::save_mosaic(
            &cells,
            &extraction.samples,
            output.scale,
            &output.directory.join("mosaic.png"),
        )?;
    }

    Ok(Summary {
        images,
        table: Some(table),
        failed,
    })
}

fn log_extent(samples: &[RainfallSample]) {
    let first = samples.iter().map(|s| s.timestamp).min();
    let last = samples.iter().map(|s| s.timestamp).max();

    if let (Some(first), Some(last)) = (first, last) {
        let (west, east, south, north) = samples.iter().fold(
            (Float::INFINITY, Float::NEG_INFINITY, Float::INFINITY, Float::NEG_INFINITY),
            |(w, e, s, n), sample| {
                (w.min(sample.lon), e.max(sample.lon), s.min(sample.lat), n.max(sample.lat))
            },
        );

        debug!(
            "Dumped {} value(s) valid from {} to {} within lon {}..{} lat {}..{}",
            samples.len(),
            first,
            last,
            west,
            east,
            south,
            north
        );
    }
}

/// Creates the output directory when it does not exist yet.
///
/// Images from previous runs with the same cell ids are overwritten.
fn prepare_output_dir(out_path: &Path) -> Result<(), PipelineError> {
    debug!("Checking and setting output directory");

    if out_path.is_dir() {
        if out_path.read_dir()?.next().is_none() {
            debug!("Output directory exists but is empty so continuing");
        } else {
            warn!(
                "Output directory {} is not empty, existing images may be overwritten",
                out_path.display()
            );
        }
    } else {
        debug!("Output directory does not exist so creating a new one");
        fs::create_dir_all(out_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{prepare_output_dir, run, Core};
    use crate::pipeline::{
        catalog::tests::grid_block,
        configuration::{Config, Decoder as DecoderSection, Input, Output, Resources, Search},
        decoder::{tests::CannedDecoder, Decoder},
        rainfall::tests::{dump, row},
    };
    use std::{fs, path::PathBuf, sync::Arc};

    fn config(out_dir: PathBuf, search: Option<Search>) -> Config {
        Config {
            decoder: DecoderSection {
                path: PathBuf::from("wgrib2"),
                timeout: 5,
            },
            input: Input {
                data_file: PathBuf::from("rain.bin"),
            },
            search,
            output: Output {
                directory: out_dir,
                mosaic: true,
                ..Output::default()
            },
            resources: Resources {
                threads: 2,
                ..Resources::default()
            },
        }
    }

    fn decoder() -> CannedDecoder {
        let mut decoder = CannedDecoder {
            grid: [
                grid_block("1.1", 2, (36.0, 35.5), (138.0, 138.5)),
                grid_block("2.1", 2, (36.0, 35.5), (138.5, 139.0)),
                grid_block("3.1", 2, (30.0, 29.5), (130.0, 130.5)),
            ]
            .concat(),
            inventory: "1.1:0:d=2021070100:APCP:surface:anl:\n\
                        2.1:0:d=2021070100:APCP:surface:anl:\n\
                        3.1:0:d=2021070100:APCP:surface:anl:\n"
                .to_string(),
            ..CannedDecoder::default()
        };

        decoder.dumps.insert(
            "1.1".to_string(),
            dump(&[row(138.0, 36.0, 1.0), row(138.1, 36.0, 5.0)]),
        );
        decoder.dumps.insert("3.1".to_string(), dump(&[row(130.0, 30.0, 80.0)]));
        decoder
    }

    #[test]
    fn renders_selected_cells_and_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("map");
        prepare_output_dir(&out_dir).unwrap();

        let search = Search {
            lat: 35.8,
            lon: 138.5,
            margin: 0.2,
            forecast: None,
        };

        let decoder: Arc<dyn Decoder> = Arc::new(decoder());
        let core = Core::with_decoder(config(out_dir.clone(), Some(search)), decoder).unwrap();

        let summary = run(&core).unwrap();

        // 2.1 has no dump and 3.1 is outside of the window
        assert_eq!(summary.failed, vec!["2.1".to_string()]);
        assert_eq!(summary.images, vec![out_dir.join("11.png")]);
        assert!(out_dir.join("11.png").is_file());
        assert!(!out_dir.join("31.png").exists());
        assert!(out_dir.join("mosaic.png").is_file());

        let table = fs::read_to_string(out_dir.join("out.csv")).unwrap();
        assert_eq!(table.lines().count(), 2);
        assert!(table.lines().nth(1).unwrap().starts_with("11,36,138,"));
    }

    #[test]
    fn whole_grid_without_search() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("map");
        prepare_output_dir(&out_dir).unwrap();

        let decoder: Arc<dyn Decoder> = Arc::new(decoder());
        let core = Core::with_decoder(config(out_dir.clone(), None), decoder).unwrap();

        let summary = run(&core).unwrap();

        assert_eq!(
            summary.images,
            vec![out_dir.join("11.png"), out_dir.join("31.png")]
        );
        assert_eq!(summary.table, Some(out_dir.join("out.csv")));
    }

    #[test]
    fn foreign_grid_description_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let decoder: Arc<dyn Decoder> = Arc::new(CannedDecoder {
            grid: "1:0:d=2021070100:APCP:surface:anl:\n".to_string(),
            ..CannedDecoder::default()
        });
        let core = Core::with_decoder(config(dir.path().to_path_buf(), None), decoder).unwrap();

        assert!(run(&core).is_err());
    }
}
