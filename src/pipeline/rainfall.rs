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

//! Module dumping rainfall values of grid cells.
//!
//! Values of each cell are read with a separate
//! `wgrib2 <file> -d <id> -csv -` call. The dump has a header line,
//! one line per pixel and a summary line:
//!
//! ```text
//! "2021-07-01 00:00:00","2021-07-01 00:05:00","APCP","surface",138.0125,35.9917,0.5
//! ```
//!
//! All times are in UTC.

use super::decoder::Decoder;
use crate::{
    errors::{ExtractError, FormatError},
    Float,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{StringRecord, Trim};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error};
use rayon::ThreadPool;
use std::sync::{mpsc, Arc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Single pixel value of a grid cell.
#[derive(Clone, PartialEq, PartialOrd, Debug)]
pub struct RainfallSample {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub lon: Float,
    pub lat: Float,
    pub value: Float,
}

/// Result of dumping a set of cells.
///
/// Samples keep the order in which ids were requested and,
/// within a cell, the order printed by the decoder.
#[derive(Debug, Default)]
pub struct Extraction {
    pub samples: Vec<RainfallSample>,
    pub failures: Vec<ExtractError>,
}

impl Extraction {
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(ExtractError::id).collect()
    }
}

/// Dumps every id on the thread pool, one decoder process per id.
///
/// A failing id is logged and reported in [`Extraction::failures`],
/// the remaining ids are still dumped.
pub fn extract(ids: &[String], decoder: &Arc<dyn Decoder>, threadpool: &ThreadPool) -> Extraction {
    let ids_count = ids.len();

    let cells_bar = ProgressBar::new(ids_count as u64);
    cells_bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    cells_bar.set_prefix("Dumped cells");

    let (tx, rx) = mpsc::channel();

    for (index, id) in ids.iter().enumerate() {
        let tx = tx.clone();
        let id = id.clone();
        let decoder = Arc::clone(decoder);

        threadpool.spawn(move || {
            let result = extract_cell(&id, decoder.as_ref());
            // receiver lives until every id has reported
            let _ = tx.send((index, result));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<Result<Vec<RainfallSample>, ExtractError>>> =
        (0..ids_count).map(|_| None).collect();

    for (index, result) in rx.iter() {
        if let Err(err) = &result {
            error!("Dumping cell failed and the cell will be skipped: {}", err);
            // keep error messages apart from the progress bar
            cells_bar.println("");
        }
        slots[index] = Some(result);
        cells_bar.inc(1);
    }

    cells_bar.finish_with_message("All cells dumped");

    let mut extraction = Extraction::default();

    for (id, slot) in ids.iter().zip(slots) {
        match slot {
            Some(Ok(samples)) => extraction.samples.extend(samples),
            Some(Err(err)) => extraction.failures.push(err),
            None => {
                error!("Worker dumping cell {} stopped without a result", id);
                extraction.failures.push(ExtractError::Lost { id: id.clone() });
            }
        }
    }

    extraction
}

/// Dumps a single cell.
pub fn extract_cell(id: &str, decoder: &dyn Decoder) -> Result<Vec<RainfallSample>, ExtractError> {
    debug!("Dumping cell {}", id);

    let dump = decoder
        .csv_dump(id)
        .map_err(|source| ExtractError::Decoder {
            id: id.to_string(),
            source,
        })?;

    parse_dump(id, &dump).map_err(|source| ExtractError::Format {
        id: id.to_string(),
        source,
    })
}

/// Parses the CSV dump of one cell, dropping its header and summary lines.
///
/// The first column of the dump is not used and the cell id is stored instead.
pub fn parse_dump(id: &str, dump: &str) -> Result<Vec<RainfallSample>, FormatError> {
    let lines: Vec<&str> = dump.lines().collect();

    if lines.len() < 2 {
        return Err(FormatError::TruncatedDump(lines.len()));
    }

    let body = &lines[1..lines.len() - 1];
    let joined = body.join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(joined.as_bytes());

    let samples: Result<Vec<RainfallSample>, FormatError> = reader
        .records()
        .map(|record| {
            let record = record.map_err(|err| FormatError::CsvRecord(err.to_string()))?;

            // positions count lines of the body from 1
            let raw = record
                .position()
                .and_then(|pos| body.get((pos.line() as usize).wrapping_sub(1)))
                .copied()
                .unwrap_or_default();

            parse_record(id, &record, raw)
        })
        .collect();

    samples
}

fn parse_record(id: &str, record: &StringRecord, line: &str) -> Result<RainfallSample, FormatError> {
    let column = |index: usize| {
        record.get(index).ok_or_else(|| FormatError::MissingColumn {
            column: index + 1,
            line: line.to_string(),
        })
    };

    let malformed = |field: &'static str| FormatError::CsvField {
        field,
        line: line.to_string(),
    };

    let timestamp = NaiveDateTime::parse_from_str(column(1)?, TIMESTAMP_FORMAT)
        .map_err(|_| malformed("timestamp"))?
        .and_utc();

    let lon = column(4)?.parse().map_err(|_| malformed("longitude"))?;
    let lat = column(5)?.parse().map_err(|_| malformed("latitude"))?;
    let value = column(6)?.parse().map_err(|_| malformed("value"))?;

    Ok(RainfallSample {
        id: id.to_string(),
        timestamp,
        lon,
        lat,
        value,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{extract, parse_dump, RainfallSample};
    use crate::errors::{ExtractError, FormatError};
    use crate::pipeline::decoder::{tests::CannedDecoder, Decoder};
    use chrono::{TimeZone, Utc};
    use float_cmp::approx_eq;
    use rayon::ThreadPoolBuilder;
    use std::sync::Arc;

    pub(crate) const HEADER: &str = "\"refTime\",\"validTime\",\"name\",\"level\",\"lon\",\"lat\",\"value\"\n";
    pub(crate) const FOOTER: &str = "#points=1\n";

    /// Wraps rows with the header and summary lines.
    pub(crate) fn dump(rows: &[String]) -> String {
        format!("{}{}{}", HEADER, rows.concat(), FOOTER)
    }

    pub(crate) fn row(lon: f64, lat: f64, value: f64) -> String {
        format!(
            "\"2021-07-01 00:00:00\",\"2021-07-01 00:05:00\",\"APCP\",\"surface\",{},{},{}\n",
            lon, lat, value
        )
    }

    #[test]
    fn single_row_dump() {
        let dump = dump(&[row(138.0125, 35.9917, 12.5)]);

        let samples = parse_dump("572.091245", &dump).unwrap();

        assert_eq!(samples.len(), 1);
        let sample: &RainfallSample = &samples[0];
        assert_eq!(sample.id, "572.091245");
        assert_eq!(sample.timestamp, Utc.with_ymd_and_hms(2021, 7, 1, 0, 5, 0).unwrap());
        assert!(approx_eq!(f64, sample.lon, 138.0125));
        assert!(approx_eq!(f64, sample.lat, 35.9917));
        assert!(approx_eq!(f64, sample.value, 12.5));
    }

    #[test]
    fn crlf_terminators() {
        let dump = "header\r\n\"a\",\"2021-07-01 00:05:00\",x,y,138.0,35.0,0.25\r\nfooter\r\n";

        let samples = parse_dump("1.1", dump).unwrap();
        assert!(approx_eq!(f64, samples[0].value, 0.25));
    }

    #[test]
    fn header_and_footer_only() {
        assert!(parse_dump("1.1", &dump(&[])).unwrap().is_empty());

        assert_eq!(parse_dump("1.1", ""), Err(FormatError::TruncatedDump(0)));
        assert_eq!(parse_dump("1.1", HEADER), Err(FormatError::TruncatedDump(1)));
    }

    #[test]
    fn malformed_rows() {
        let short = dump(&["\"a\",\"2021-07-01 00:05:00\",x,y,138.0\n".to_string()]);
        assert!(matches!(
            parse_dump("1.1", &short),
            Err(FormatError::MissingColumn { column: 6, .. })
        ));

        let bad_time = dump(&["\"a\",\"yesterday\",x,y,138.0,35.0,1.0\n".to_string()]);
        assert!(matches!(
            parse_dump("1.1", &bad_time),
            Err(FormatError::CsvField { field: "timestamp", .. })
        ));

        let bad_value = dump(&["\"a\",\"2021-07-01 00:05:00\",x,y,138.0,35.0,heavy\n".to_string()]);
        assert!(matches!(
            parse_dump("1.1", &bad_value),
            Err(FormatError::CsvField { field: "value", .. })
        ));
    }

    #[test]
    fn errors_carry_the_raw_row() {
        let rows = [
            row(138.0, 36.0, 1.0),
            "\"a\",\"2021-07-01 00:05:00\",x,y,138.1,36.0\n".to_string(),
        ];

        assert_eq!(
            parse_dump("1.1", &dump(&rows)),
            Err(FormatError::MissingColumn {
                column: 7,
                line: "\"a\",\"2021-07-01 00:05:00\",x,y,138.1,36.0".to_string(),
            })
        );
    }

    #[test]
    fn padded_numbers() {
        let dump = "header\n\"a\",\"2021-07-01 00:05:00\",x,y, 138.5 ,36.0, 3.5\nfooter\n";

        let samples = parse_dump("1.1", dump).unwrap();
        assert_eq!(samples[0].timestamp, Utc.with_ymd_and_hms(2021, 7, 1, 0, 5, 0).unwrap());
        assert!(approx_eq!(f64, samples[0].lon, 138.5));
        assert!(approx_eq!(f64, samples[0].value, 3.5));
    }

    #[test]
    fn extracts_single_cell() {
        let mut decoder = CannedDecoder::default();
        decoder.dumps.insert(
            "572.091245".to_string(),
            dump(&[row(138.0125, 35.9917, 12.5)]),
        );

        let decoder: Arc<dyn Decoder> = Arc::new(decoder);
        let threadpool = ThreadPoolBuilder::new().num_threads(1).build().unwrap();

        let extraction = extract(&["572.091245".to_string()], &decoder, &threadpool);

        assert!(extraction.failures.is_empty());
        assert_eq!(extraction.samples.len(), 1);

        let sample = &extraction.samples[0];
        assert_eq!(sample.id, "572.091245");
        assert_eq!(sample.timestamp, Utc.with_ymd_and_hms(2021, 7, 1, 0, 5, 0).unwrap());
        assert!(approx_eq!(f64, sample.value, 12.5));
    }

    #[test]
    fn keeps_request_order_and_reports_failures() {
        let mut decoder = CannedDecoder::default();
        decoder.dumps.insert(
            "1.1".to_string(),
            dump(&[row(138.0, 36.0, 1.0), row(138.1, 36.0, 2.0)]),
        );
        decoder.dumps.insert(
            "2.1".to_string(),
            dump(&[row(139.0, 36.0, 3.0)]),
        );
        decoder
            .dumps
            .insert("3.1".to_string(), dump(&["broken\n".to_string()]));

        let decoder: Arc<dyn Decoder> = Arc::new(decoder);
        let threadpool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();

        let ids: Vec<String> = ["2.1", "3.1", "9.9", "1.1", "2.1"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let extraction = extract(&ids, &decoder, &threadpool);

        let values: Vec<f64> = extraction.samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![3.0, 1.0, 2.0, 3.0]);
        assert_eq!(extraction.failed_ids(), vec!["3.1", "9.9"]);
        assert!(matches!(extraction.failures[0], ExtractError::Format { .. }));
        assert!(matches!(extraction.failures[1], ExtractError::Decoder { .. }));
    }
}
