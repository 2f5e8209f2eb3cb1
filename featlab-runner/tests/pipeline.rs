//! End-to-end runs over small CSV fixtures written to a temp directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;

use featlab_runner::{
    build_matrix, export_csv_string, read_manifest, run_pipeline, RunConfig, RunError,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

const PRICES: &str = "\
symbol,trade_date,open,high,low,close,volume,vwap,trade_count
AAA,2024-01-02,100,102,99,101,1000,100.5,10
AAA,2024-01-03,101,103,100,102,1100,101.5,11
AAA,2024-01-04,102,104,101,103,1200,,12
AAA,2024-01-05,103,105,102,104,1300,103.5,13
AAA,2024-01-08,104,106,103,105,1400,104.5,14
BBB,2024-01-03,50,51,49,50.5,500,50.2,5
BBB,2024-01-04,50.5,52,50,51,600,51.1,6
";

const STATEMENTS: &str = "\
symbol,fiscal_period_end,statement_type,metric,value
AAA,2023-12-31,income,revenue,1000
AAA,2023-12-31,income,net_income,100
AAA,2023-12-31,balance_sheet,total_assets,5000
AAA,2023-12-31,balance_sheet,total_equity,2000
AAA,2023-12-31,cash_flow,operating_cash_flow,150
";

const EARNINGS: &str = "\
symbol,release_date,eps_estimate,reported_eps,surprise_pct
AAA,2024-01-04,1.0,1.1,10.0
";

const ECONOMIC: &str = "\
series_id,observation_date,realtime_start,value
FEDFUNDS,2023-12-01,2024-01-01,5.33
FEDFUNDS,2023-12-01,2024-01-04,5.34
UNRATE,2023-12-01,2024-01-05,3.7
";

const FINBERT: &str = "\
symbol,news_date,sentiment_label,confidence
AAA,2024-01-03,positive,0.9
AAA,2024-01-03,negative,0.7
AAA,2024-01-03,mixed,0.5
";

const ROBERTA: &str = "\
symbol,news_date,sentiment_label,confidence
AAA,2024-01-03,neutral,0.6
";

/// Write the fixtures and a run file; return the run file path.
fn write_fixture(dir: &Path, output: &str, extra: &str) -> PathBuf {
    for (name, body) in [
        ("prices.csv", PRICES),
        ("statements.csv", STATEMENTS),
        ("earnings.csv", EARNINGS),
        ("economic.csv", ECONOMIC),
        ("finbert.csv", FINBERT),
        ("roberta.csv", ROBERTA),
    ] {
        fs::write(dir.join(name), body).unwrap();
    }
    let run = format!(
        r#"
{extra}

[pipeline]
cutoff_date = "2024-01-04"

[inputs]
prices = "prices.csv"
statements = "statements.csv"
earnings = "earnings.csv"
economic = "economic.csv"

[inputs.sentiment]
finbert = "finbert.csv"
roberta = "roberta.csv"

[output]
path = "{output}"
"#
    );
    let path = dir.join("run.toml");
    fs::write(&path, run).unwrap();
    path
}

fn read_output_csv(path: &Path) -> Vec<HashMap<String, String>> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    rdr.records()
        .map(|r| {
            let r = r.unwrap();
            headers
                .iter()
                .zip(r.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

fn row<'a>(rows: &'a [HashMap<String, String>], symbol: &str, date: &str) -> &'a HashMap<String, String> {
    rows.iter()
        .find(|r| r["symbol"] == symbol && r["prediction_date"] == date)
        .unwrap()
}

#[test]
fn csv_run_writes_matrix_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let run_file = write_fixture(dir.path(), "out/features.csv", "");
    let config = RunConfig::from_file(&run_file).unwrap();
    let result = run_pipeline(&config).unwrap();

    let output = dir.path().join("out/features.csv");
    let rows = read_output_csv(&output);
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0].len(), 97);

    // Sorted by (symbol, prediction_date).
    let keys: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r["symbol"].as_str(), r["prediction_date"].as_str()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let first = row(&rows, "AAA", "2024-01-02");
    assert_eq!(first["feature_date"], "2024-01-01");
    assert_eq!(first["target"], "0.01");
    assert_eq!(first["prev_close"], "");
    assert_eq!(first["econ_fedfunds"], "5.33");
    assert_eq!(first["split"], "train");

    let second = row(&rows, "AAA", "2024-01-03");
    assert_eq!(second["prev_close"], "101");
    assert_eq!(second["prev_trade_count"], "10");
    assert_eq!(second["days_since_prev_bar"], "0");

    // News dated 01-03 feeds the row whose feature date is 01-03.
    let news = row(&rows, "AAA", "2024-01-04");
    assert_eq!(news["finbert_total_count"], "2");
    assert_eq!(news["finbert_positive_count"], "1");
    assert_eq!(news["roberta_neutral_count"], "1");
    assert_eq!(news["revenue"], "");
    assert_eq!(news["econ_fedfunds"], "5.33");
    assert_eq!(news["split"], "train");

    // Release and revision on 01-04 become visible to feature date 01-04.
    let after = row(&rows, "AAA", "2024-01-05");
    assert_eq!(after["revenue"], "1000");
    assert_eq!(after["reported_eps"], "1.1");
    assert_eq!(after["econ_fedfunds"], "5.34");
    assert_eq!(after["econ_unrate"], "");
    assert_eq!(after["finbert_total_count"], "");
    assert_eq!(after["split"], "test");

    // Monday after a weekend reads Friday's bar.
    let monday = row(&rows, "AAA", "2024-01-08");
    assert_eq!(monday["feature_date"], "2024-01-07");
    assert_eq!(monday["prev_close"], "104");
    assert_eq!(monday["days_since_prev_bar"], "2");
    assert_eq!(monday["econ_unrate"], "3.7");

    let manifest_path = result.manifest_path.unwrap();
    assert_eq!(manifest_path, dir.path().join("out/manifest.json"));
    let manifest = read_manifest(&manifest_path).unwrap();
    assert_eq!(manifest, result.manifest);
    assert_eq!(manifest.columns.len(), 97);
    assert_eq!(manifest.cutoff_date, d(2024, 1, 4));
    assert_eq!(manifest.stats.rows, 7);
    assert_eq!(manifest.stats.symbols, 2);
    assert_eq!(manifest.stats.train_rows, 5);
    assert_eq!(manifest.stats.test_rows, 2);
    assert_eq!(manifest.rejected_rows(), 1);
    assert_eq!(manifest.ingest.sources["sentiment.finbert"].rejected, 1);
    assert_eq!(manifest.ingest.sources["prices"].accepted, 7);
}

#[test]
fn parquet_run_keeps_column_types() {
    let dir = tempfile::tempdir().unwrap();
    let run_file = write_fixture(dir.path(), "features.parquet", "");
    let config = RunConfig::from_file(&run_file).unwrap();
    run_pipeline(&config).unwrap();

    let file = fs::File::open(dir.path().join("features.parquet")).unwrap();
    let df = ParquetReader::new(file).finish().unwrap();
    assert_eq!(df.height(), 7);
    assert_eq!(df.width(), 97);
    assert_eq!(df.column("prediction_date").unwrap().dtype(), &DataType::Date);
    assert_eq!(df.column("target").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("prev_trade_count").unwrap().dtype(), &DataType::Int64);
    assert_eq!(df.column("split").unwrap().dtype(), &DataType::String);
    assert_eq!(df.column("prev_close").unwrap().null_count(), 2);
}

#[test]
fn provenance_columns_follow_split() {
    let dir = tempfile::tempdir().unwrap();
    let run_file = write_fixture(dir.path(), "features.csv", "");
    let mut config = RunConfig::from_file(&run_file).unwrap();
    config.pipeline.emit_provenance = true;
    run_pipeline(&config).unwrap();

    let rows = read_output_csv(&dir.path().join("features.csv"));
    let after = row(&rows, "AAA", "2024-01-05");
    assert_eq!(after["price_known_at"], "2024-01-04");
    assert_eq!(after["income_known_at"], "2024-01-04");
    assert_eq!(after["earnings_known_at"], "2024-01-04");
    assert_eq!(after["economic_known_at"], "2024-01-04");
}

#[test]
fn thread_count_does_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    let run_file = write_fixture(dir.path(), "features.csv", "");
    let config = RunConfig::from_file(&run_file).unwrap();

    let one = build_matrix(&config.clone().with_threads(1)).unwrap();
    let four = build_matrix(&config.with_threads(4)).unwrap();
    assert_eq!(one.matrix.rows, four.matrix.rows);
    assert_eq!(one.snapshot_hash, four.snapshot_hash);
    assert_eq!(
        export_csv_string(&one.matrix).unwrap(),
        export_csv_string(&four.matrix).unwrap()
    );
}

#[test]
fn missing_input_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let run_file = write_fixture(dir.path(), "features.csv", "");
    fs::remove_file(dir.path().join("earnings.csv")).unwrap();
    let config = RunConfig::from_file(&run_file).unwrap();
    assert!(matches!(run_pipeline(&config), Err(RunError::Data(_))));
    assert!(!dir.path().join("features.csv").exists());
}

#[test]
fn manifest_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let run_file = write_fixture(dir.path(), "features.csv", "threads = 2");
    let mut config = RunConfig::from_file(&run_file).unwrap();
    config.output.manifest = false;
    let result = run_pipeline(&config).unwrap();
    assert!(result.manifest_path.is_none());
    assert!(!dir.path().join("manifest.json").exists());
    assert_eq!(config.threads, 2);
}
