//! Combined table serialization tests

use ccd_common::lookup::CountyLookup;
use ccd_common::models::{CountyRecord, MergedRow, COLUMNS};
use ccd_common::table::{parse_rows, read_table, write_table};

fn sample_rows() -> Vec<MergedRow> {
    let mut la = MergedRow::from_base(
        &CountyRecord {
            fips_key: "06037".to_string(),
            state_name: "California".to_string(),
            county_name: "Los Angeles".to_string(),
            population: 9_936_690,
            median_income: Some(76_367.0),
        },
        "CA",
    );
    la.disaster_count = 41;
    la.unemployment_rate = Some(5.1);
    la.obesity_rate = Some(24.3);
    la.diabetes_rate = Some(11.2);
    la.smoking_rate = Some(9.0);
    la.binge_drinking_rate = Some(16.5);

    let dona_ana = MergedRow::from_base(
        &CountyRecord {
            fips_key: "35013".to_string(),
            state_name: "New Mexico".to_string(),
            county_name: "Doña Ana, \"Mesilla\"".to_string(),
            population: 0,
            median_income: None,
        },
        "NM",
    );

    vec![la, dona_ana]
}

#[test]
fn test_round_trip_preserves_rows_and_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("combined_county_data.csv");
    let rows = sample_rows();

    write_table(&path, &rows).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let raw = parse_rows(&text);
    assert_eq!(raw[0], COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());

    let back = read_table(&path).unwrap();
    assert_eq!(back.len(), rows.len());
    assert_eq!(back, rows);
}

#[test]
fn test_nulls_written_as_empty_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.csv");
    write_table(&path, &sample_rows()[1..]).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let line = text.lines().nth(1).unwrap();
    assert!(line.starts_with("35013,NM,New Mexico,\"Doña Ana, \"\"Mesilla\"\"\",0,,,0,"));
    assert!(line.ends_with(",,,"));
}

#[test]
fn test_lookup_from_table() {
    let lookup = CountyLookup::from_rows(&sample_rows());
    assert_eq!(lookup.len(), 2);
    assert_eq!(lookup.get("06037").unwrap().disaster_count, 41);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lookup.json");
    lookup.write_json(&path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["counties"]["35013"]["state_abbr"], "NM");
}
