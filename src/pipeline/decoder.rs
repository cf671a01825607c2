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

//! Module wrapping the `wgrib2` executable.
//!
//! Every call starts a fresh process on the configured data file and
//! blocks until its standard output is fully read and the process exits.
//! Nothing is cached between calls.

use super::configuration::Config;
use crate::constants::{CSV_STDOUT_FLAGS, DUMP_FLAG, GRID_FLAG};
use crate::errors::DecoderError;
use log::debug;
use std::{
    ffi::OsString,
    io::Read,
    path::PathBuf,
    process::{Child, Command, Stdio},
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Text producer for the three output modes used by the pipeline.
///
/// Implementors must be shareable between the dumping threads.
pub trait Decoder: Send + Sync {
    /// Output of `<decoder> <file> -grid`.
    fn grid_description(&self) -> Result<String, DecoderError>;

    /// Output of `<decoder> <file>` (message inventory).
    fn inventory(&self) -> Result<String, DecoderError>;

    /// Output of `<decoder> <file> -d <id> -csv -`.
    fn csv_dump(&self, id: &str) -> Result<String, DecoderError>;
}

/// Decoder backed by a `wgrib2` process.
#[derive(Clone, PartialEq, Debug)]
pub struct Wgrib2 {
    executable: PathBuf,
    data_file: PathBuf,
    timeout: Duration,
}

impl Wgrib2 {
    pub fn new(config: &Config) -> Self {
        Wgrib2 {
            executable: config.decoder.path.clone(),
            data_file: config.input.data_file.clone(),
            timeout: config.decoder.timeout(),
        }
    }

    fn run(&self, extra_args: &[&str]) -> Result<String, DecoderError> {
        let mut args: Vec<OsString> = vec![self.data_file.clone().into_os_string()];
        args.extend(extra_args.iter().map(OsString::from));

        let command = format!(
            "{} {}",
            self.executable.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        debug!("Running {}", command);

        let started = Instant::now();
        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DecoderError::CantStart {
                command: command.clone(),
                source,
            })?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        // reading happens off-thread so that the timeout
        // also covers a process which never closes its stdout
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stderr_reader = thread::spawn(move || {
                let mut err = Vec::new();
                let _ = stderr.as_mut().map(|pipe| pipe.read_to_end(&mut err));
                err
            });

            let mut out = Vec::new();
            let read_out = stdout
                .as_mut()
                .map_or(Ok(0), |pipe| pipe.read_to_end(&mut out));
            let err = stderr_reader.join().unwrap_or_default();

            // receiver is gone when the call already timed out
            let _ = tx.send(read_out.map(|_| (out, err)));
        });

        let (out, err) = match rx.recv_timeout(self.timeout) {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DecoderError::Read { command, source });
            }
            Err(_) => return Err(self.timed_out(&mut child, command)),
        };

        // stdout may close long before the process exits
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    return Err(self.timed_out(&mut child, command));
                }
                Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
                Err(source) => {
                    let _ = child.kill();
                    return Err(DecoderError::Wait { command, source });
                }
            }
        };

        if !status.success() {
            return Err(DecoderError::NonZeroExit {
                command,
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&err).trim().to_string(),
            });
        }

        String::from_utf8(out).map_err(|_| DecoderError::NotUtf8 { command })
    }

    fn timed_out(&self, child: &mut Child, command: String) -> DecoderError {
        let _ = child.kill();
        let _ = child.wait();

        DecoderError::Timeout {
            command,
            timeout: self.timeout,
        }
    }
}

impl Decoder for Wgrib2 {
    fn grid_description(&self) -> Result<String, DecoderError> {
        self.run(&[GRID_FLAG])
    }

    fn inventory(&self) -> Result<String, DecoderError> {
        self.run(&[])
    }

    fn csv_dump(&self, id: &str) -> Result<String, DecoderError> {
        self.run(&[DUMP_FLAG, id, CSV_STDOUT_FLAGS[0], CSV_STDOUT_FLAGS[1]])
    }
}
