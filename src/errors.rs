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

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Error while reading config.yaml: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Error while running decoder: {0}")]
    Decoder(#[from] DecoderError),

    #[error("Decoder output has unexpected format: {0}")]
    Format(#[from] FormatError),

    #[error("Error while exporting images: {0}")]
    Export(#[from] ExportError),

    #[error("Cannot prepare output directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot set memory limit: {0}")]
    MemoryLimit(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open config.yaml: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize config.yaml: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds {0}")]
    OutOfBounds(&'static str),
}

#[derive(Error, Debug)]
pub enum DecoderError {
    #[error("Cannot start decoder `{command}`: {source}")]
    CantStart {
        command: String,
        source: std::io::Error,
    },

    #[error("Decoder `{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Decoder `{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("Cannot read output of decoder `{command}`: {source}")]
    Read {
        command: String,
        source: std::io::Error,
    },

    #[error("Cannot wait for decoder `{command}` to exit: {source}")]
    Wait {
        command: String,
        source: std::io::Error,
    },

    #[error("Decoder `{command}` output is not valid UTF-8")]
    NotUtf8 { command: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum FormatError {
    #[error("No grid cells found in non-empty grid description")]
    NoGridCells,

    #[error("Cannot parse {field} in grid description `{line}`")]
    GridField { field: &'static str, line: String },

    #[error("Per-cell CSV dump has {0} line(s), expected header and summary")]
    TruncatedDump(usize),

    #[error("Missing column {column} in CSV row `{line}`")]
    MissingColumn { column: usize, line: String },

    #[error("Cannot parse {field} in CSV row `{line}`")]
    CsvField { field: &'static str, line: String },

    #[error("Cannot read CSV row: {0}")]
    CsvRecord(String),

    #[error("Unknown forecast label `{0}`")]
    UnknownForecast(String),

    #[error("Invalid decoder output pattern: {0}")]
    Pattern(String),
}

impl From<regex::Error> for FormatError {
    fn from(err: regex::Error) -> Self {
        FormatError::Pattern(err.to_string())
    }
}

/// Per-cell extraction failure, attributable to the id.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Decoder failed for cell {id}: {source}")]
    Decoder { id: String, source: DecoderError },

    #[error("Malformed dump for cell {id}: {source}")]
    Format { id: String, source: FormatError },

    #[error("Dumping cell {id} stopped without a result")]
    Lost { id: String },
}

impl ExtractError {
    pub fn id(&self) -> &str {
        match self {
            ExtractError::Decoder { id, .. }
            | ExtractError::Format { id, .. }
            | ExtractError::Lost { id } => id,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot write image for cell {id}: {source}")]
    Image {
        id: String,
        source: image::ImageError,
    },

    #[error("Cannot move image for cell {id} into place: {source}")]
    Rename { id: String, source: std::io::Error },

    #[error("Cannot write coordinate table: {0}")]
    Table(#[from] csv::Error),

    #[error("Cannot flush coordinate table: {0}")]
    TableFlush(#[from] std::io::Error),

    #[error("Cannot write mosaic: {0}")]
    Mosaic(#[source] image::ImageError),

    #[error("Resolution of cell {0} is zero")]
    ZeroResolution(String),

    #[error("Image of {0} does not fit in u32 pixels")]
    TooLarge(String),
}
