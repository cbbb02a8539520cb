use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Dataset-level header of one TOD file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodMeta {
    pub name: String,
    pub sample_rate_hz: f64,
    /// Wall-clock time of the first sample.
    pub start: DateTime<Utc>,
}

/// Per-detector metadata carried in the TOD header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorInfo {
    pub uid: u32,
    /// ±1 factor aligning the detector with the sky-brightness sign
    /// convention.
    pub optical_sign: f64,
    /// IV responsivity in W per DAQ unit; `None` when the IV analysis had
    /// no solution for this detector.
    pub cal_daq_to_w: Option<f64>,
}

/// One time-ordered dataset: a row of samples per detector, plus the header
/// metadata needed to interpret them.
#[derive(Debug, Clone)]
pub struct TodData {
    pub meta: TodMeta,
    pub detectors: Vec<DetectorInfo>,
    /// Elapsed seconds since `meta.start`, one per sample column.
    pub times: Array1<f64>,
    /// Shape `(n_detectors, n_samples)`.
    pub data: Array2<f64>,
}

impl TodData {
    pub fn n_detectors(&self) -> usize {
        self.detectors.len()
    }

    pub fn n_samples(&self) -> usize {
        self.times.len()
    }

    /// Row index of the detector with the given uid.
    pub fn detector_index(&self, uid: u32) -> Option<usize> {
        self.detectors.iter().position(|det| det.uid == uid)
    }
}

/// IV responsivities for every detector of a TOD, with a validity mask.
///
/// `values` stays aligned with the data rows: masked-out detectors carry a
/// unit gain so indexing never goes through a second lookup.
#[derive(Debug, Clone)]
pub struct Calibration {
    pub values: Array1<f64>,
    pub mask: Vec<bool>,
}

impl Calibration {
    pub fn n_valid(&self) -> usize {
        self.mask.iter().filter(|valid| **valid).count()
    }
}

/// Extracts the IV calibration stored alongside the data.
pub fn iv_calibration(tod: &TodData) -> Calibration {
    let mut values = Vec::with_capacity(tod.detectors.len());
    let mut mask = Vec::with_capacity(tod.detectors.len());
    for det in &tod.detectors {
        match det.cal_daq_to_w {
            Some(cal) if cal.is_finite() => {
                values.push(cal);
                mask.push(true);
            }
            _ => {
                values.push(1.0);
                mask.push(false);
            }
        }
    }
    Calibration {
        values: Array1::from_vec(values),
        mask,
    }
}
