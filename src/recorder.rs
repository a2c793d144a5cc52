//! # Sample Recorder
//!
//! Appends every accepted sample to a CSV, Excel workbook or JSON Lines file.
//!
//! The file is flushed (or the workbook resaved) after each sample so a
//! crash or unplugged device loses at most the row being written. Recording
//! runs on its own blocking task and never holds up acquisition.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_xlsxwriter::Workbook;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{PlotterError, Result};
use crate::telemetry::{Channel, Sample};

/// Timestamp layout used in the `Timestamp` column
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Worksheet holding the samples in `.xlsx` output
pub const XLSX_SHEET_NAME: &str = "Serial Data";

/// Samples queued for the recorder before new ones are dropped
pub const RECORDER_QUEUE_CAPACITY: usize = 1024;

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// Excel workbook with a single "Serial Data" sheet
    Xlsx,
    /// One JSON object per line
    Jsonl,
}

impl FromStr for RecordFormat {
    type Err = PlotterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(RecordFormat::Csv),
            "xlsx" => Ok(RecordFormat::Xlsx),
            "jsonl" => Ok(RecordFormat::Jsonl),
            other => Err(PlotterError::Config(serde::de::Error::custom(format!(
                "recorder format must be 'csv', 'xlsx' or 'jsonl', got '{}'",
                other
            )))),
        }
    }
}

/// Header row shared by the CSV and workbook outputs
pub fn header_row() -> Vec<&'static str> {
    let mut header = vec!["Time", "Timestamp"];
    header.extend(Channel::ALL.iter().map(|c| c.label()));
    header
}

/// Rewrite the whole workbook with the header and every sample so far
fn save_workbook(path: &Path, samples: &[Sample]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME)?;

    for (col, title) in header_row().into_iter().enumerate() {
        sheet.write_string(0, col as u16, title)?;
    }

    for (i, sample) in samples.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, sample.time as f64)?;
        sheet.write_string(row, 1, sample.timestamp.format(TIMESTAMP_FORMAT).to_string())?;
        for (j, channel) in Channel::ALL.iter().enumerate() {
            sheet.write_number(row, j as u16 + 2, sample.reading.value(*channel))?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

type BoxedWriter = Box<dyn Write + Send>;

enum Sink {
    Csv(csv::Writer<BoxedWriter>),
    Jsonl(BufWriter<BoxedWriter>),
    // The workbook format has no append, so rows are kept and resaved
    Xlsx(Vec<Sample>),
}

/// Writes samples to a file, one row per sample
pub struct Recorder {
    sink: Sink,
    path: PathBuf,
    rows: u64,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl Recorder {
    /// Create (or truncate) the output file
    ///
    /// Missing parent directories are created. CSV files and workbooks get
    /// their header row immediately.
    ///
    /// # Errors
    ///
    /// Returns error if the file or its directory cannot be created
    pub fn create<P: AsRef<Path>>(path: P, format: RecordFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let recorder = match format {
            RecordFormat::Xlsx => {
                save_workbook(&path, &[])?;
                Self {
                    sink: Sink::Xlsx(Vec::new()),
                    path,
                    rows: 0,
                }
            }
            RecordFormat::Csv | RecordFormat::Jsonl => {
                let file = File::create(&path)?;
                Self::with_writer(Box::new(file), format, path)?
            }
        };

        info!("Recording samples to {} ({:?})", recorder.path.display(), format);
        Ok(recorder)
    }

    /// Build a text-format recorder on top of any writer
    fn with_writer(writer: BoxedWriter, format: RecordFormat, path: PathBuf) -> Result<Self> {
        let sink = match format {
            RecordFormat::Csv => {
                let mut writer = csv::Writer::from_writer(writer);
                writer.write_record(header_row())?;
                writer.flush()?;
                Sink::Csv(writer)
            }
            RecordFormat::Jsonl => Sink::Jsonl(BufWriter::new(writer)),
            RecordFormat::Xlsx => Sink::Xlsx(Vec::new()),
        };

        Ok(Self { sink, path, rows: 0 })
    }

    /// Append one sample and flush it to disk
    pub fn record(&mut self, sample: &Sample) -> Result<()> {
        match &mut self.sink {
            Sink::Csv(writer) => {
                let r = &sample.reading;
                writer.write_record([
                    sample.time.to_string(),
                    sample.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    r.temperature.to_string(),
                    r.voltage.to_string(),
                    r.current.to_string(),
                    r.power.to_string(),
                ])?;
                writer.flush()?;
            }
            Sink::Jsonl(writer) => {
                serde_json::to_writer(&mut *writer, sample)?;
                writer.write_all(b"\n")?;
                writer.flush()?;
            }
            Sink::Xlsx(samples) => {
                samples.push(sample.clone());
                if let Err(e) = save_workbook(&self.path, samples) {
                    samples.pop();
                    return Err(e);
                }
            }
        }

        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of samples written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

/// Move a recorder onto a blocking task fed by a bounded channel
///
/// Write failures are logged and the task carries on with the next sample.
/// The task ends once every sender is dropped and returns the number of
/// rows written.
pub fn spawn_recorder(mut recorder: Recorder) -> (mpsc::Sender<Sample>, JoinHandle<u64>) {
    let (tx, mut rx) = mpsc::channel::<Sample>(RECORDER_QUEUE_CAPACITY);

    let handle = tokio::task::spawn_blocking(move || {
        while let Some(sample) = rx.blocking_recv() {
            if let Err(e) = recorder.record(&sample) {
                error!("Failed to record sample {} to {}: {}", sample.time, recorder.path().display(), e);
                continue;
            }
            debug!("Recorded sample {}", sample.time);
        }

        info!("Recorder closed after {} rows", recorder.rows());
        recorder.rows()
    });

    (tx, handle)
}
