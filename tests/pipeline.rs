//! E2E tests running the binary against generated store exports and workbooks

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const ORDERS: &str = "\
Name,Fulfillment Status,Total,Refunded Amount,Shipping,Taxes,Shipping City,Shipping Province,Created at
#1001,fulfilled,61.69,0,5.00,1.69,South Lake Tahoe,CA,2023-01-15 10:00:00 -0800
#1001,,,,,,,,
#1002,fulfilled,40.00,10.00,4.00,0,Davis,CA,2023-02-01 09:30:00 -0800
#1003,fulfilled,50.00,0,6.00,0,Reno,NV,2023-02-03 12:00:00 -0800
#1004,fulfilled,21.45,0,0,1.45,Los Angeles,CA,2023-02-10 08:00:00 -0800
#1005,fulfilled,16.34,0,5.00,0.84,Shingle Springs,CA,2023-03-01 17:45:00 -0800
#1006,fulfilled,30.24,0,0,2.24,Davis,CA,2023-03-20 11:11:11 -0700
#1007,unfulfilled,99.00,0,0,7.00,Davis,CA,2023-03-30 10:00:00 -0700
#1008,fulfilled,21.60,0,0,1.60,Sacramento,CA,2023-04-02 10:00:00 -0700
";

const TAXES: &str = "\
Order,Destination State,Filed By Channel,Sale Type,Product,Product Variant,Jurisdiction,Tax Rate,Tax Amount
#1001,California,Not Filed,Order,Mug,,California,0.0725,1.45
#1001,California,Not Filed,Order,Mug,,South Lake Tahoe,0.012,0.24
#1004,California,Filed,Order,Print,,California,0.0725,1.45
#1005,California,Not Filed,Order,Card,,California,0.08,0.84
#1006,California,Not Filed,Order,Shirt,Large,California,0.08,2.24
#1008,California,Not Filed,Order,Mug,,California,0.08,1.60
";

fn write_rates(path: &Path) {
    let rows: &[(&str, f64, &str)] = &[
        ("EL DORADO COUNTY", 0.0725, ""),
        ("South Lake Tahoe*", 0.0875, "El Dorado"),
        ("Shingle Springs", 0.0725, "El Dorado"),
        ("Bell (LA County)", 0.1025, "Los Angeles"),
        ("Los Angeles", 0.095, "Los Angeles"),
        ("Davis", 0.0825, "Yolo"),
    ];
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Location").unwrap();
    sheet.write_string(0, 1, "Rate").unwrap();
    sheet.write_string(0, 2, "County").unwrap();
    for (i, (city, rate, county)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *city).unwrap();
        sheet.write_number(row, 1, *rate).unwrap();
        if !county.is_empty() {
            sheet.write_string(row, 2, *county).unwrap();
        }
    }
    workbook.save(path).unwrap();
}

fn write_schedule(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "SCHEDULE A - COMPUTATION SCHEDULE FOR DISTRICT TAX").unwrap();
    sheet.write_string(3, 9, "Taxable income").unwrap();
    sheet.write_number(3, 10, 100.0).unwrap();
    sheet.write_string(7, 8, "County").unwrap();
    sheet.write_string(7, 9, "City").unwrap();
    sheet.write_string(8, 8, "EL DORADO").unwrap();
    sheet.write_string(8, 9, "SOUTH LAKE TAHOE").unwrap();
    sheet.write_string(9, 9, "EL DORADO COUNTY UNINCORPORATED AREA").unwrap();
    sheet.write_string(10, 8, "YOLO").unwrap();
    sheet.write_string(10, 9, "DAVIS").unwrap();
    sheet.write_number(10, 6, 10.0).unwrap();
    sheet.write_string(11, 9, "YOLO COUNTY UNINCORPORATED AREA").unwrap();
    workbook.add_worksheet().write_string(0, 0, "Notes").unwrap();
    workbook.save(path).unwrap();
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("orders-2023-q1.csv"), ORDERS).unwrap();
    fs::write(dir.path().join("taxes-2023-q1.csv"), TAXES).unwrap();
    write_rates(&dir.path().join("tax-rates.xlsx"));
    write_schedule(&dir.path().join("scheduleA.xlsx"));
    dir
}

fn catax(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_catax"))
        .args(args)
        .arg("--dir")
        .arg(dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute command")
}

fn first_sheet(path: &Path) -> calamine::Range<Data> {
    let mut workbook = open_workbook_auto(path).unwrap();
    workbook.worksheet_range_at(0).unwrap().unwrap()
}

fn number(range: &calamine::Range<Data>, cell: (u32, u32)) -> f64 {
    match range.get_value(cell) {
        Some(Data::Float(f)) => *f,
        Some(Data::Int(i)) => *i as f64,
        other => panic!("expected a number at {:?}, found {:?}", cell, other),
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
}

#[test]
fn report_fills_schedule() {
    let dir = fixture();
    let output = catax(dir.path(), &["report"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("SALES TAX SUMMARY (2023 Q1: 2023-01-01 to 2023-03-31)"));
    assert!(stdout.contains("Gross: $231.32 | Interstate: $44.00 | Shipping: $20.00"));
    assert!(stdout.contains("From orders: $6.37 | From tax report: $6.37"));
    assert!(stdout.contains("California: $47.45 | Total: $117.82"));
    assert!(stdout.contains("TAXABLE INCOME: $113.50"));
    assert!(stdout.contains("south lake tahoe"));
    assert!(stdout.contains("el dorado county"));
    assert!(stdout.contains("G11"));
    assert!(stdout.contains("WARNINGS (2)"));
    assert_eq!(stdout.matches("cannot find county of city 'sacramento'").count(), 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("cannot find"), "{}", stderr);
    assert!(stdout.contains("cannot find 'unknown county'"));

    let sheet = first_sheet(&dir.path().join("scheduleA-2023-q1.xlsx"));
    assert_close(number(&sheet, (8, 6)), 20.0);
    assert_close(number(&sheet, (9, 6)), 10.5);
    assert_close(number(&sheet, (10, 6)), 38.0);
    assert_eq!(sheet.get_value((11, 6)), Some(&Data::Empty));
    assert_close(number(&sheet, (3, 10)), 213.5);
    assert_eq!(
        sheet.get_value((8, 9)),
        Some(&Data::String("SOUTH LAKE TAHOE".into()))
    );

    // the template is left untouched
    let template = first_sheet(&dir.path().join("scheduleA.xlsx"));
    assert_close(number(&template, (3, 10)), 100.0);
    assert_close(number(&template, (10, 6)), 10.0);

    let reference = fs::read_to_string(dir.path().join("formatted-city-to-county.csv")).unwrap();
    let lines: Vec<&str> = reference.lines().collect();
    assert_eq!(
        lines,
        vec![
            "City,County",
            "south lake tahoe,el dorado",
            "shingle springs,el dorado",
            "bell,los angeles",
            "los angeles,los angeles",
            "davis,yolo",
        ]
    );
}

#[test]
fn report_within_period() {
    let dir = fixture();
    let output = catax(dir.path(), &["report", "--within-period", "--json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["period"], "2023 Q1");
    assert_eq!(report["summary"]["gross"], "209.72");
    assert_eq!(report["summary"]["taxable_income"], "93.50");
    assert_eq!(report["summary"]["sales_tax_report"], "4.77");
    assert_eq!(report["diagnostics"].as_array().unwrap().len(), 0);
    assert_eq!(report["districts"].as_array().unwrap().len(), 3);

    let sheet = first_sheet(&dir.path().join("scheduleA-2023-q1.xlsx"));
    assert_close(number(&sheet, (3, 10)), 193.5);
}

#[test]
fn report_json_lists_diagnostics() {
    let dir = fixture();
    let output = catax(dir.path(), &["report", "--json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let kinds: Vec<&str> = report["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["UnresolvedCity", "UnmatchedScheduleRow"]);

    let unknown = report["districts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["jurisdiction"]["name"] == "unknown")
        .unwrap();
    assert_eq!(unknown["amount"], "20.00");
    assert!(unknown["row"].is_null());
}

#[test]
fn identical_runs_write_identical_workbooks() {
    let dir = fixture();
    let first = dir.path().join("first.xlsx");
    let second = dir.path().join("second.xlsx");
    for path in [&first, &second] {
        let output = catax(dir.path(), &["report", "--output", path.to_str().unwrap()]);
        assert!(output.status.success(), "Command failed: {:?}", output);
    }
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn classify_csv() {
    let dir = fixture();
    let output = catax(dir.path(), &["classify", "--csv"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "order,city,county,district,jurisdiction",
            "#1001,south lake tahoe,el dorado,City,south lake tahoe",
            "#1005,shingle springs,el dorado,Unincorporated,el dorado county",
            "#1006,davis,yolo,City,davis",
            "#1008,sacramento,unknown,Unincorporated,unknown county",
        ]
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot find county of city 'sacramento'"), "{}", stderr);
}

#[test]
fn label_cost_shipping_reads_billing() {
    let dir = fixture();
    fs::write(
        dir.path().join("billing-2023-q1.csv"),
        "Order,Charge category,Amount\n#1001,Shipping labels,4.00\n#1002,Shipping labels,3.00\n#1001,App fees,9.99\n",
    )
    .unwrap();
    let output = catax(dir.path(), &["report", "--shipping", "label-cost", "--json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["total_shipping"], "7.00");
}

#[test]
fn missing_export_is_an_error() {
    let dir = fixture();
    let output = catax(dir.path(), &["report", "--period", "2023-q2"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("orders-2023-q2.csv"), "{}", stderr);
}

#[test]
fn invalid_period_is_rejected() {
    let dir = fixture();
    let output = catax(dir.path(), &["report", "--period", "2023-q5"]);
    assert!(!output.status.success());
}

#[test]
fn out_of_range_period_is_rejected_without_panicking() {
    let dir = fixture();
    let output = catax(dir.path(), &["report", "--period", "300000-q1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid reporting period"), "{}", stderr);
    assert!(!stderr.contains("panicked"), "{}", stderr);
}

#[test]
fn template_is_never_overwritten() {
    let dir = fixture();
    let template = dir.path().join("scheduleA.xlsx");
    let before = fs::read(&template).unwrap();

    let aliased = dir.path().join(".").join("scheduleA.xlsx");
    let output = Command::new(env!("CARGO_BIN_EXE_catax"))
        .arg("report")
        .arg("--dir")
        .arg(dir.path())
        .arg("--output")
        .arg(&aliased)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Refusing to overwrite"), "{}", stderr);
    assert_eq!(fs::read(&template).unwrap(), before);
}

#[test]
fn schema_headers() {
    let output = Command::new(env!("CARGO_BIN_EXE_catax"))
        .args(["schema", "--headers"])
        .output()
        .expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("Name,Fulfillment Status,Total"));
    assert!(stdout.contains("Order,Charge category,Amount"));
}
