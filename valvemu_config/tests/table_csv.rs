use std::fs::File;
use std::io::Write;

use rstest::rstest;
use tempfile::tempdir;
use valvemu_config::{load_table_csv, validate_rows};

fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

#[rstest]
fn loads_a_valid_table() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "table.csv",
        "threshold_c,duty,slope\n85.0,0,0.0\n60.0,30,-1.2\n40.0,78,-2.4\n",
    );
    let rows = load_table_csv(&path).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].duty, 30);
    assert_eq!(rows[2].threshold_c, 40.0);
}

#[rstest]
fn rejects_wrong_headers() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "table.csv", "temp,duty,slope\n85.0,0,0.0\n");
    let err = load_table_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("threshold_c,duty,slope"));
}

#[rstest]
fn rejects_ascending_rows() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "table.csv",
        "threshold_c,duty,slope\n40.0,78,-2.4\n60.0,30,-1.2\n",
    );
    let err = load_table_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("strictly descending"));
}

#[rstest]
fn rejects_malformed_rows_with_line_numbers() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "table.csv",
        "threshold_c,duty,slope\n85.0,0,0.0\nnot-a-number,1,2\n",
    );
    let err = load_table_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("row 3"));
}

#[rstest]
fn validate_rows_rejects_empty_and_non_finite() {
    assert!(validate_rows(&[]).is_err());
    let rows = [valvemu_config::TableRow {
        threshold_c: f32::INFINITY,
        duty: 0,
        slope: 0.0,
    }];
    assert!(validate_rows(&rows).is_err());
}
