//! Reader for the TOD5 on-disk format.
//!
//! A TOD5 file is CSV with four header rows followed by data:
//!
//! ```text
//! TOD5,<dataset name>,<sample_rate_hz>,<start, RFC 3339 UTC>
//! time_s,det_<uid>,det_<uid>,...
//! optical_sign,<±1 per detector>
//! cal_daq_to_w,<W per DAQ unit per detector; empty = no IV solution>
//! <elapsed seconds>,<one reading per detector>
//! ...
//! ```
//!
//! Empty cells and `NAN` tokens in data rows become NaN samples.

use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, StringRecordsIter};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::ParserError;
use crate::model::{DetectorInfo, TodData, TodMeta};

/// First cell of the first header row.
pub const FORMAT_TAG: &str = "TOD5";

const DATA_START_ROW: usize = 5;

/// Options honored while reading a TOD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadOptions {
    /// Linearly interpolate non-finite samples, per detector.
    pub repair_gaps: bool,
    /// Restrict loading to these detector uids, in the order given.
    pub detectors: Option<Vec<u32>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            repair_gaps: true,
            detectors: None,
        }
    }
}

/// Reads one TOD5 file from disk.
pub fn read_tod(path: &Path, opts: &LoadOptions) -> Result<TodData, ParserError> {
    let content = fs::read_to_string(path).map_err(|source| ParserError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tod(&content, opts)
}

/// Parses TOD5 content already in memory.
pub fn parse_tod(content: &str, opts: &LoadOptions) -> Result<TodData, ParserError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let meta = parse_meta(&next_header_row(&mut records, 1)?)?;
    let uids = parse_columns(&next_header_row(&mut records, 2)?)?;
    let n_det = uids.len();

    let signs = parse_labeled_row(&next_header_row(&mut records, 3)?, "optical_sign", n_det, 3)?;
    for (uid, sign) in uids.iter().zip(&signs) {
        if *sign != 1.0 && *sign != -1.0 {
            return Err(ParserError::Validation {
                message: format!("detector {uid}: optical sign must be 1 or -1, found {sign}"),
            });
        }
    }

    let cals = parse_labeled_row(&next_header_row(&mut records, 4)?, "cal_daq_to_w", n_det, 4)?;

    let mut times = Vec::new();
    let mut flat = Vec::new();
    for (offset, record) in records.enumerate() {
        let record = record?;
        let line_index = DATA_START_ROW + offset;
        if record.len() == 1 && record.get(0).unwrap_or("").trim().is_empty() {
            continue;
        }
        if record.len() != n_det + 1 {
            return Err(ParserError::DataRow {
                line_index,
                message: format!("expected {} cells, found {}", n_det + 1, record.len()),
            });
        }
        let time = parse_sample(record.get(0).unwrap_or(""))
            .map_err(|message| ParserError::DataRow {
                line_index,
                message,
            })?;
        if !time.is_finite() {
            return Err(ParserError::DataRow {
                line_index,
                message: "sample time must be finite".to_string(),
            });
        }
        times.push(time);
        for cell in record.iter().skip(1) {
            flat.push(parse_sample(cell).map_err(|message| ParserError::DataRow {
                line_index,
                message,
            })?);
        }
    }
    if times.is_empty() {
        return Err(ParserError::EmptyData);
    }

    let n_samples = times.len();
    let row_major = Array2::from_shape_vec((n_samples, n_det), flat).map_err(|err| {
        ParserError::Validation {
            message: err.to_string(),
        }
    })?;
    let mut data = row_major.t().to_owned();

    let mut detectors: Vec<DetectorInfo> = uids
        .iter()
        .enumerate()
        .map(|(idx, &uid)| DetectorInfo {
            uid,
            optical_sign: signs[idx],
            cal_daq_to_w: cals[idx].is_finite().then_some(cals[idx]),
        })
        .collect();

    if let Some(wanted) = &opts.detectors {
        let mut indices = Vec::with_capacity(wanted.len());
        for &uid in wanted {
            let idx = detectors
                .iter()
                .position(|det| det.uid == uid)
                .ok_or(ParserError::UnknownDetector { uid })?;
            indices.push(idx);
        }
        data = data.select(Axis(0), &indices);
        detectors = indices.iter().map(|&idx| detectors[idx]).collect();
    }

    if opts.repair_gaps {
        repair_gaps(&mut data);
    }

    Ok(TodData {
        meta,
        detectors,
        times: Array1::from_vec(times),
        data,
    })
}

fn next_header_row<R: Read>(
    records: &mut StringRecordsIter<'_, R>,
    row_index: usize,
) -> Result<StringRecord, ParserError> {
    match records.next() {
        Some(Ok(record)) => Ok(record),
        Some(Err(source)) => Err(ParserError::Csv { source }),
        None => Err(ParserError::InvalidHeader {
            row_index,
            message: "missing header row".to_string(),
        }),
    }
}

fn parse_meta(record: &StringRecord) -> Result<TodMeta, ParserError> {
    let tag = record.get(0).unwrap_or("").trim();
    if tag != FORMAT_TAG {
        return Err(ParserError::FormatMismatch {
            reason: format!("expected leading '{FORMAT_TAG}' cell, found '{tag}'"),
        });
    }
    if record.len() != 4 {
        return Err(ParserError::InvalidHeader {
            row_index: 1,
            message: format!("expected 4 metadata cells, found {}", record.len()),
        });
    }

    let name = record.get(1).unwrap_or("").trim().to_string();
    if name.is_empty() {
        return Err(ParserError::InvalidHeader {
            row_index: 1,
            message: "dataset name is empty".to_string(),
        });
    }

    let rate_cell = record.get(2).unwrap_or("").trim();
    let sample_rate_hz: f64 = rate_cell.parse().map_err(|_| ParserError::InvalidHeader {
        row_index: 1,
        message: format!("invalid sample rate '{rate_cell}'"),
    })?;
    if !(sample_rate_hz > 0.0) {
        return Err(ParserError::InvalidHeader {
            row_index: 1,
            message: format!("sample rate must be positive, found {sample_rate_hz}"),
        });
    }

    let start_cell = record.get(3).unwrap_or("").trim();
    let start = DateTime::parse_from_rfc3339(start_cell)
        .map_err(|err| ParserError::InvalidHeader {
            row_index: 1,
            message: format!("invalid start timestamp '{start_cell}': {err}"),
        })?
        .with_timezone(&Utc);

    Ok(TodMeta {
        name,
        sample_rate_hz,
        start,
    })
}

fn parse_columns(record: &StringRecord) -> Result<Vec<u32>, ParserError> {
    let first = record.get(0).unwrap_or("").trim();
    if first != "time_s" {
        return Err(ParserError::FormatMismatch {
            reason: format!("expected leading 'time_s' column, found '{first}'"),
        });
    }

    let mut uids = Vec::with_capacity(record.len().saturating_sub(1));
    for cell in record.iter().skip(1) {
        let cell = cell.trim();
        let uid = cell
            .strip_prefix("det_")
            .and_then(|raw| raw.parse::<u32>().ok())
            .ok_or_else(|| ParserError::InvalidHeader {
                row_index: 2,
                message: format!("column '{cell}' is not det_<uid>"),
            })?;
        if uids.contains(&uid) {
            return Err(ParserError::Validation {
                message: format!("duplicate detector uid {uid}"),
            });
        }
        uids.push(uid);
    }
    if uids.is_empty() {
        return Err(ParserError::InvalidHeader {
            row_index: 2,
            message: "file declares no detectors".to_string(),
        });
    }
    Ok(uids)
}

fn parse_labeled_row(
    record: &StringRecord,
    label: &str,
    n_det: usize,
    row_index: usize,
) -> Result<Vec<f64>, ParserError> {
    let first = record.get(0).unwrap_or("").trim();
    if first != label {
        return Err(ParserError::InvalidHeader {
            row_index,
            message: format!("expected '{label}' row, found '{first}'"),
        });
    }
    if record.len() != n_det + 1 {
        return Err(ParserError::InvalidHeader {
            row_index,
            message: format!("expected {} cells, found {}", n_det + 1, record.len()),
        });
    }
    let mut values = Vec::with_capacity(n_det);
    for cell in record.iter().skip(1) {
        values.push(parse_sample(cell).map_err(|message| ParserError::InvalidHeader {
            row_index,
            message,
        })?);
    }
    Ok(values)
}

fn parse_sample(cell: &str) -> Result<f64, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| format!("invalid number '{cell}'"))
}

/// Linear interpolation across non-finite runs, one detector row at a time.
/// Gaps at either end are held at the nearest finite sample; a row with no
/// finite samples at all is left untouched.
fn repair_gaps(data: &mut Array2<f64>) {
    for mut row in data.outer_iter_mut() {
        let n = row.len();
        let finite: Vec<usize> = (0..n).filter(|&idx| row[idx].is_finite()).collect();
        if finite.is_empty() || finite.len() == n {
            continue;
        }

        let first = finite[0];
        let first_val = row[first];
        for idx in 0..first {
            row[idx] = first_val;
        }

        let last = finite[finite.len() - 1];
        let last_val = row[last];
        for idx in last + 1..n {
            row[idx] = last_val;
        }

        for anchors in finite.windows(2) {
            let (lo, hi) = (anchors[0], anchors[1]);
            if hi - lo > 1 {
                let (lo_val, hi_val) = (row[lo], row[hi]);
                let span = (hi - lo) as f64;
                for idx in lo + 1..hi {
                    let frac = (idx - lo) as f64 / span;
                    row[idx] = lo_val + (hi_val - lo_val) * frac;
                }
            }
        }
    }
}
