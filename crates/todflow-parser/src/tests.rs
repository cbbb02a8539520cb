use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};

use crate::errors::ParserError;
use crate::format::{parse_tod, read_tod, LoadOptions};
use crate::model::iv_calibration;

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

fn assert_close(found: f64, expected: f64) {
    assert!(
        (found - expected).abs() < 1e-9,
        "expected {expected}, found {found}"
    );
}

#[test]
fn parses_the_multi_detector_fixture() {
    let content = fixture("obs_20140510_0853.tod");
    let tod = parse_tod(&content, &LoadOptions::default()).expect("parse failed");

    assert_eq!(tod.meta.name, "obs_20140510_0853");
    assert_close(tod.meta.sample_rate_hz, 400.0);
    assert_eq!(
        tod.meta.start,
        Utc.with_ymd_and_hms(2014, 5, 10, 6, 21, 0).unwrap()
    );

    assert_eq!(tod.n_detectors(), 3);
    assert_eq!(tod.n_samples(), 5);
    assert_eq!(tod.data.shape(), &[3, 5]);

    let uids: Vec<u32> = tod.detectors.iter().map(|det| det.uid).collect();
    assert_eq!(uids, vec![13, 14, 15]);
    assert_close(tod.detectors[0].optical_sign, 1.0);
    assert_close(tod.detectors[1].optical_sign, -1.0);
    assert_eq!(tod.detectors[0].cal_daq_to_w, Some(0.000512));
    assert_eq!(tod.detectors[2].cal_daq_to_w, None);

    assert_close(tod.data[[0, 0]], 512.1);
    assert_close(tod.data[[2, 4]], 20.9);
    assert_close(tod.times[4], 0.0100);
    assert_eq!(tod.detector_index(14), Some(1));
    assert_eq!(tod.detector_index(99), None);
}

#[test]
fn gap_repair_interpolates_missing_samples() {
    let content = fixture("obs_20140510_0853.tod");
    let tod = parse_tod(&content, &LoadOptions::default()).expect("parse failed");

    // det_14 is missing sample 1: midpoint of -33.2 and -35.0
    assert_close(tod.data[[1, 1]], -34.1);
    // det_15 is missing sample 3: midpoint of 20.4 and 20.9
    assert_close(tod.data[[2, 3]], 20.65);
}

#[test]
fn gaps_stay_nan_when_repair_is_disabled() {
    let content = fixture("obs_20140510_0853.tod");
    let opts = LoadOptions {
        repair_gaps: false,
        ..LoadOptions::default()
    };
    let tod = parse_tod(&content, &opts).expect("parse failed");

    assert!(tod.data[[1, 1]].is_nan());
    assert!(tod.data[[2, 3]].is_nan());
}

#[test]
fn end_gaps_are_held_at_the_nearest_finite_sample() {
    let content = "\
TOD5,edges,100.0,2015-01-01T00:00:00Z
time_s,det_1
optical_sign,1
cal_daq_to_w,1.0
0.00,
0.01,5.0
0.02,
";
    let tod = parse_tod(content, &LoadOptions::default()).expect("parse failed");
    assert_close(tod.data[[0, 0]], 5.0);
    assert_close(tod.data[[0, 1]], 5.0);
    assert_close(tod.data[[0, 2]], 5.0);
}

#[test]
fn a_detector_with_no_finite_samples_is_left_alone() {
    let content = "\
TOD5,nans,100.0,2015-01-01T00:00:00Z
time_s,det_1,det_2
optical_sign,1,1
cal_daq_to_w,1.0,1.0
0.00,,1.0
0.01,,2.0
";
    let tod = parse_tod(content, &LoadOptions::default()).expect("parse failed");
    assert!(tod.data[[0, 0]].is_nan());
    assert!(tod.data[[0, 1]].is_nan());
    assert_close(tod.data[[1, 1]], 2.0);
}

#[test]
fn detector_subset_preserves_the_requested_order() {
    let content = fixture("obs_20140510_0853.tod");
    let opts = LoadOptions {
        detectors: Some(vec![15, 13]),
        ..LoadOptions::default()
    };
    let tod = parse_tod(&content, &opts).expect("parse failed");

    let uids: Vec<u32> = tod.detectors.iter().map(|det| det.uid).collect();
    assert_eq!(uids, vec![15, 13]);
    assert_eq!(tod.data.shape(), &[2, 5]);
    assert_close(tod.data[[1, 0]], 512.1);
}

#[test]
fn requesting_an_unknown_detector_is_an_error() {
    let content = fixture("obs_short_0901.tod");
    let opts = LoadOptions {
        detectors: Some(vec![1, 42]),
        ..LoadOptions::default()
    };
    match parse_tod(&content, &opts) {
        Err(ParserError::UnknownDetector { uid }) => assert_eq!(uid, 42),
        other => panic!("expected UnknownDetector, got {other:?}"),
    }
}

#[test]
fn rejects_a_file_without_the_format_tag() {
    let content = "\
TOA5,logger,400.0,2015-01-01T00:00:00Z
time_s,det_1
optical_sign,1
cal_daq_to_w,1.0
0.0,1.0
";
    assert!(matches!(
        parse_tod(content, &LoadOptions::default()),
        Err(ParserError::FormatMismatch { .. })
    ));
}

#[test]
fn rejects_an_optical_sign_that_is_not_unit() {
    let content = "\
TOD5,badsign,100.0,2015-01-01T00:00:00Z
time_s,det_1
optical_sign,0.5
cal_daq_to_w,1.0
0.0,1.0
";
    match parse_tod(content, &LoadOptions::default()) {
        Err(ParserError::Validation { message }) => {
            assert!(message.contains("optical sign"), "message: {message}")
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn rejects_duplicate_detector_uids() {
    let content = "\
TOD5,dups,100.0,2015-01-01T00:00:00Z
time_s,det_1,det_1
optical_sign,1,1
cal_daq_to_w,1.0,1.0
0.0,1.0,2.0
";
    assert!(matches!(
        parse_tod(content, &LoadOptions::default()),
        Err(ParserError::Validation { .. })
    ));
}

#[test]
fn rejects_a_header_only_file() {
    let content = "\
TOD5,empty,100.0,2015-01-01T00:00:00Z
time_s,det_1
optical_sign,1
cal_daq_to_w,1.0
";
    assert!(matches!(
        parse_tod(content, &LoadOptions::default()),
        Err(ParserError::EmptyData)
    ));
}

#[test]
fn rejects_a_truncated_header() {
    let content = "\
TOD5,truncated,100.0,2015-01-01T00:00:00Z
time_s,det_1
";
    match parse_tod(content, &LoadOptions::default()) {
        Err(ParserError::InvalidHeader { row_index, .. }) => assert_eq!(row_index, 3),
        other => panic!("expected InvalidHeader, got {other:?}"),
    }
}

#[test]
fn rejects_a_data_row_with_the_wrong_width() {
    let content = "\
TOD5,ragged,100.0,2015-01-01T00:00:00Z
time_s,det_1,det_2
optical_sign,1,1
cal_daq_to_w,1.0,1.0
0.0,1.0,2.0
0.1,3.0
";
    match parse_tod(content, &LoadOptions::default()) {
        Err(ParserError::DataRow { line_index, .. }) => assert_eq!(line_index, 6),
        other => panic!("expected DataRow, got {other:?}"),
    }
}

#[test]
fn rejects_a_non_finite_sample_time() {
    let content = "\
TOD5,badtime,100.0,2015-01-01T00:00:00Z
time_s,det_1
optical_sign,1
cal_daq_to_w,1.0
NAN,1.0
";
    assert!(matches!(
        parse_tod(content, &LoadOptions::default()),
        Err(ParserError::DataRow { .. })
    ));
}

#[test]
fn iv_calibration_masks_detectors_without_a_solution() {
    let content = fixture("obs_20140510_0853.tod");
    let tod = parse_tod(&content, &LoadOptions::default()).expect("parse failed");

    let cal = iv_calibration(&tod);
    assert_eq!(cal.mask, vec![true, true, false]);
    assert_eq!(cal.n_valid(), 2);
    assert_close(cal.values[0], 0.000512);
    assert_close(cal.values[1], 0.000507);
    // masked detectors carry a unit gain to stay aligned with data rows
    assert_close(cal.values[2], 1.0);
}

#[test]
fn read_tod_surfaces_io_errors_with_the_path() {
    let missing = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/does_not_exist.tod");
    match read_tod(&missing, &LoadOptions::default()) {
        Err(ParserError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn parses_the_short_fixture_from_disk() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/obs_short_0901.tod");
    let tod = read_tod(&path, &LoadOptions::default()).expect("read failed");
    assert_eq!(tod.meta.name, "obs_short_0901");
    assert_eq!(tod.data.shape(), &[2, 3]);
    assert_close(tod.data[[0, 2]], 3.0);
    assert_close(tod.data[[1, 0]], 10.0);
}
