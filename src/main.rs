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

//! Rainfall Grid Renderer (RGR) turns the text output of
//! [wgrib2](https://www.cpc.ncep.noaa.gov/products/wesley/wgrib2/)
//! for gridded rainfall products (such as the JMA precipitation nowcast)
//! into color-coded PNG overlays.
//!
//! The program reads the grid description of the input file,
//! selects grid cells around the configured location, dumps rainfall
//! values of each selected cell and renders one image per cell together
//! with a table of cell corners for map overlay viewers.

mod constants;
mod errors;
mod pipeline;

use cap::Cap;
use env_logger::Env;
use log::{error, info};
use std::{alloc, env, path::PathBuf};

type Float = f64;

/// Global allocator used by the program.
///
/// Use of static global allocator allows for capping the memory to the limit set by user
/// in configuration file and in effect provide better [OOM error](https://en.wikipedia.org/wiki/Out_of_memory) handling.
#[global_allocator]
static ALLOCATOR: Cap<alloc::System> = Cap::new(alloc::System, usize::MAX);

/// The main program function.
/// Prepares the runtime environment and calls the [`pipeline::main`].
///
/// The only accepted argument is the path to configuration file,
/// `config.yaml` in working directory is used when it is omitted.
fn main() {
    #[cfg(not(feature = "debug"))]
    let logger_env = Env::new().filter_or("RGR_LOG_LEVEL", "info");

    #[cfg(feature = "debug")]
    let logger_env = Env::new().filter_or("RGR_LOG_LEVEL", "debug");

    env_logger::Builder::from_env(logger_env)
        .format_timestamp_millis()
        .init();

    let config_path = env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("config.yaml"), PathBuf::from);

    match pipeline::main(&config_path) {
        Ok(_) => info!("Rendering finished. Check the output directory and log."),
        Err(err) => error!("Rendering failed with error: {}", err),
    }
}
