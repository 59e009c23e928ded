//! End-to-end run tests: driver + adapters + merge + table output

mod helpers;

use ccd_collector::census_export::{resolve_variables, write_export, CensusExporter};
use ccd_collector::sources::CensusClient;
use ccd_collector::{finish, RunDriver, SkipReason, Sources};
use ccd_common::models::COLUMNS;
use ccd_common::table::{parse_rows, read_table};
use ccd_common::Error;
use helpers::{capture_logs, FakeUpstream, Scenario};
use serde_json::json;

fn three_states() -> Scenario {
    let mut scenario = Scenario::default()
        .with_counties("06", &[("037", "Los Angeles"), ("001", "Alameda")])
        .with_counties("17", &[("031", "Cook"), ("097", "Lake"), ("043", "DuPage")])
        .with_generated_counties("48", 45);
    scenario.census_failing.insert("06".to_string());
    scenario.fema.insert(
        "IL".to_string(),
        vec![
            "Cook (County)".to_string(),
            "Cook (County)".to_string(),
            "Cook (County)".to_string(),
            "Lake (County)".to_string(),
            "Statewide".to_string(),
        ],
    );
    scenario.places.insert(
        "IL".to_string(),
        vec![
            json!({"locationid": "17031", "measureid": "OBESITY", "data_value": "31.2"}),
            json!({"locationid": "17097", "measureid": "BINGE", "data_value": "19.0"}),
        ],
    );
    scenario
}

fn states(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_failed_base_region_is_skipped_and_logged() {
    let (logs, _guard) = capture_logs();
    let server = FakeUpstream::start(three_states()).await;
    let config = server.config();
    let driver = RunDriver::new(&config, Sources::from_config(&config).unwrap());

    let summary = driver.run(&states(&["CA", "IL", "TX"])).await;

    assert!(summary.rows.iter().all(|r| r.state_abbr != "CA"));
    assert_eq!(summary.rows.len(), 3 + 45);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0, "CA");
    assert!(matches!(summary.skipped[0].1, SkipReason::BaseSourceFailed(_)));
    logs.assert_warned("Skipping state", "CA");

    // CA made no dependent calls
    let log = server.log();
    assert_eq!(log.census_states, vec!["06", "17", "48"]);
    assert_eq!(log.places_states, vec!["IL", "TX"]);
    assert_eq!(log.bls_batches, vec![3, 20, 20, 5]);
}

#[tokio::test]
async fn test_merged_rows_follow_base_and_defaults() {
    let server = FakeUpstream::start(three_states()).await;
    let config = server.config();
    let driver = RunDriver::new(&config, Sources::from_config(&config).unwrap());

    let summary = driver.run(&states(&["IL", "TX"])).await;
    let il: Vec<_> = summary.rows.iter().filter(|r| r.state_abbr == "IL").collect();
    let tx: Vec<_> = summary.rows.iter().filter(|r| r.state_abbr == "TX").collect();

    assert_eq!(il.len(), 3);
    assert_eq!(il[0].fips_key, "17031");
    assert_eq!(il[0].disaster_count, 3);
    assert_eq!(il[0].unemployment_rate, Some(4.5));
    assert_eq!(il[0].obesity_rate, Some(31.2));
    assert_eq!(il[0].binge_drinking_rate, Some(0.0));
    assert_eq!(il[1].disaster_count, 1);
    assert_eq!(il[1].binge_drinking_rate, Some(19.0));
    assert_eq!(il[2].county_name, "DuPage");
    assert_eq!(il[2].disaster_count, 0);
    assert!(il[2].obesity_rate.is_none());

    // FEMA 404 and no PLACES data for TX
    assert_eq!(tx.len(), 45);
    assert!(tx.iter().all(|r| r.disaster_count == 0));
    assert!(tx.iter().all(|r| r.obesity_rate.is_none() && r.smoking_rate.is_none()));
    assert!(tx.iter().all(|r| r.unemployment_rate == Some(4.5)));

    let il_report = &summary.processed[0];
    assert_eq!(il_report.stats.disaster_matched, 2);
    assert_eq!(il_report.stats.disaster_unmatched_names, 1);
}

#[tokio::test]
async fn test_finish_writes_canonical_table() {
    let server = FakeUpstream::start(three_states()).await;
    let config = server.config();
    let driver = RunDriver::new(&config, Sources::from_config(&config).unwrap());
    let summary = driver.run(&states(&["IL"])).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("combined_county_data.csv");
    let lookup = dir.path().join("county_lookup.json");
    let saved = finish(&summary, &output, Some(&lookup)).unwrap();
    assert_eq!(saved, 3);

    let text = std::fs::read_to_string(&output).unwrap();
    let rows = parse_rows(&text);
    assert_eq!(rows[0], COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    assert_eq!(rows.len(), 4);

    assert_eq!(read_table(&output).unwrap(), summary.rows);

    let blob: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&lookup).unwrap()).unwrap();
    assert_eq!(blob["counties"]["17031"]["county_name"], "Cook");
}

#[tokio::test]
async fn test_no_data_collected_writes_nothing() {
    let mut scenario = three_states();
    scenario.census_failing.insert("17".to_string());
    let server = FakeUpstream::start(scenario).await;
    let config = server.config();
    let driver = RunDriver::new(&config, Sources::from_config(&config).unwrap());

    let summary = driver.run(&states(&["CA", "IL", "XX"])).await;
    assert!(summary.rows.is_empty());
    assert_eq!(summary.skipped.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("combined.csv");
    let err = finish(&summary, &output, None).unwrap_err();
    assert!(matches!(err, Error::NoDataCollected));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_census_export_renames_and_skips_failures() {
    let server = FakeUpstream::start(three_states()).await;
    let config = server.config();
    let client = CensusClient::new(config.census.clone(), &config.http).unwrap();
    let exporter = CensusExporter::new(&client);

    let variables = resolve_variables("B01003_001E,B99999_001E").unwrap();
    let fips = states(&["06", "17", "48"]);
    let table = exporter.export(&variables, &fips).await;

    assert_eq!(table.failed, vec!["06"]);
    assert_eq!(
        table.header,
        vec!["County Name", "Total Population", "B99999_001E", "state", "county"]
    );
    assert_eq!(table.rows.len(), 3 + 45);
    assert_eq!(exporter.pauses(), 2);
    assert_eq!(server.log().census_variables, vec!["NAME", "B01003_001E", "B99999_001E"]);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("export.csv");
    assert_eq!(write_export(&table, &output).unwrap(), 48);
    let rows = parse_rows(&std::fs::read_to_string(&output).unwrap());
    assert_eq!(rows[1][0], "Cook County, Illinois");
}
