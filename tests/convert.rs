use std::{fs, path::Path, path::PathBuf};

use csv_to_netcdf::{convert, ConversionError, ConvertOptions, FlagPair};
use netcdf::AttributeValue;
use tempfile::TempDir;

const OZONE: &str = "\
Ozone Box Unit 1
someone@example.org
Surface ozone, one minute means
Field team
Calibrated 2019-08-01
Time (UTC),Ozone Concentration (ppb),Quality Control Falg Value,Quality Control Flag Meaning
02/08/2019 23:59:00,31.5,0,good data
03/08/2019 00:00:00,32.25,2,instrument fault
03/08/2019 00:01:00,,1,missing value
03/08/2019 00:02:00,33,0,good data
";

fn write_csv(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn run(input: &Path, output: &Path, skip_rows: usize) -> csv_to_netcdf::Result<()> {
    let options = ConvertOptions { skip_rows, ..Default::default() };
    convert(input, output, &options).map(|_| ())
}

fn ints(file: &netcdf::File, name: &str) -> Vec<i64> {
    file.variable(name).unwrap().get_values::<i64, _>(..).unwrap()
}

fn doubles(file: &netcdf::File, name: &str) -> Vec<f64> {
    file.variable(name).unwrap().get_values::<f64, _>(..).unwrap()
}

fn text_attr(value: Option<netcdf::Attribute>) -> String {
    match value.unwrap().value().unwrap() {
        AttributeValue::Str(s) => s,
        other => panic!("expected a string attribute, got {other:?}"),
    }
}

#[test]
fn test_two_by_two_table() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "ab.csv", "a,b\n1,2\n3,4\n");
    let output = dir.path().join("ab.nc");

    let summary = convert(&input, &output, &ConvertOptions::default()).unwrap();
    assert_eq!((summary.rows, summary.variables), (2, 2));

    let file = netcdf::open(&output).unwrap();
    assert_eq!(file.dimensions().count(), 1);
    assert_eq!(file.dimension("row").unwrap().len(), 2);
    assert_eq!(file.variables().count(), 2);
    assert_eq!(ints(&file, "a"), vec![1, 3]);
    assert_eq!(ints(&file, "b"), vec![2, 4]);
    assert_eq!(text_attr(file.attribute("source")), "ab.csv");
    assert!(text_attr(file.attribute("history")).starts_with("Created at "));
}

#[test]
fn test_skiprows_keeps_skipped_lines_as_attributes() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "x.csv", "# a\n# b\n# c\nx\n5\n6\n7\n");
    let output = dir.path().join("x.nc");

    run(&input, &output, 3).unwrap();

    let file = netcdf::open(&output).unwrap();
    assert_eq!(file.dimension("row").unwrap().len(), 3);
    assert_eq!(ints(&file, "x"), vec![5, 6, 7]);
    assert_eq!(text_attr(file.attribute("header_0")), "# a");
    assert_eq!(text_attr(file.attribute("header_2")), "# c");
    assert!(file.attribute("header_3").is_none());
}

#[test]
fn test_skiprows_same_as_stripping_lines() {
    let dir = TempDir::new().unwrap();
    let body = "p,q,r\n1,0.5,-2\n2,1.5,-4\n3,2.5,-8\n";
    let with_junk = write_csv(&dir, "junk.csv", &format!("junk line\nmore, junk, here\n{body}"));
    let stripped = write_csv(&dir, "clean.csv", body);
    let out_junk = dir.path().join("junk.nc");
    let out_clean = dir.path().join("clean.nc");

    run(&with_junk, &out_junk, 2).unwrap();
    run(&stripped, &out_clean, 0).unwrap();

    let a = netcdf::open(&out_junk).unwrap();
    let b = netcdf::open(&out_clean).unwrap();
    assert_eq!(ints(&a, "p"), ints(&b, "p"));
    assert_eq!(doubles(&a, "q"), doubles(&b, "q"));
    assert_eq!(ints(&a, "r"), ints(&b, "r"));
    assert_eq!(doubles(&a, "q"), vec![0.5, 1.5, 2.5]);
}

#[test]
fn test_numeric_round_trip_and_rerun() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "n.csv", "i,f\n-7,1e-3\n9007199254740993,-2.75\n0,3\n");
    let output = dir.path().join("n.nc");

    run(&input, &output, 0).unwrap();
    let first = {
        let file = netcdf::open(&output).unwrap();
        (ints(&file, "i"), doubles(&file, "f"))
    };
    assert_eq!(first.0, vec![-7, 9007199254740993, 0]);
    assert_eq!(first.1, vec![1e-3, -2.75, 3.0]);

    run(&input, &output, 0).unwrap();
    let file = netcdf::open(&output).unwrap();
    assert_eq!((ints(&file, "i"), doubles(&file, "f")), first);
    assert_eq!(file.variables().count(), 2);
}

#[test]
fn test_existing_output_is_replaced() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "a.csv", "a\n1\n");
    let output = dir.path().join("a.nc");
    fs::write(&output, "not a netcdf file").unwrap();

    run(&input, &output, 0).unwrap();

    let file = netcdf::open(&output).unwrap();
    assert_eq!(ints(&file, "a"), vec![1]);
}

#[test]
fn test_text_and_missing_values() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "t.csv", "site,depth,m/s\nalpha,1,0.5\n\"b, quoted\",,\n");
    let output = dir.path().join("t.nc");

    run(&input, &output, 0).unwrap();

    let file = netcdf::open(&output).unwrap();
    let site = file.variable("site").unwrap();
    assert_eq!(site.get_string((0,)).unwrap(), "alpha");
    assert_eq!(site.get_string((1,)).unwrap(), "b, quoted");

    let depth = doubles(&file, "depth");
    assert_eq!(depth[0], 1.0);
    assert!(depth[1].is_nan());

    let speed = file.variable("m_s").unwrap();
    assert_eq!(text_attr(speed.attribute("long_name")), "m/s");
}

#[test]
fn test_header_only_table() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "h.csv", "a,b\n");
    let output = dir.path().join("h.nc");

    run(&input, &output, 0).unwrap();

    let file = netcdf::open(&output).unwrap();
    assert_eq!(file.dimension("row").unwrap().len(), 0);
    assert_eq!(file.variables().count(), 2);
}

#[test]
fn test_time_and_flag_columns() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "ozone.csv", OZONE);
    let output = dir.path().join("ozone.nc");
    let options = ConvertOptions {
        skip_rows: 5,
        time_column: Some("Time (UTC)".into()),
        title: Some("Ozone Box Unit 1 Data".into()),
        flags: vec![FlagPair {
            values: "Quality Control Falg Value".into(),
            meanings: "Quality Control Flag Meaning".into(),
        }],
        ..Default::default()
    };

    let summary = convert(&input, &output, &options).unwrap();
    assert_eq!((summary.rows, summary.variables), (4, 4));

    let file = netcdf::open(&output).unwrap();
    assert_eq!(file.dimension("time").unwrap().len(), 4);
    assert_eq!(text_attr(file.attribute("title")), "Ozone Box Unit 1 Data");
    assert_eq!(text_attr(file.attribute("header_1")), "someone@example.org");
    assert_eq!(text_attr(file.attribute("start_time")), "2019-08-02 23:59:00Z");
    assert_eq!(text_attr(file.attribute("end_time")), "2019-08-03 00:02:00Z");

    assert_eq!(doubles(&file, "time"), vec![86340.0, 86400.0, 86460.0, 86520.0]);
    let time = file.variable("time").unwrap();
    assert_eq!(text_attr(time.attribute("units")), "seconds since 2019-08-02 00:00:00 +00:00");

    let ozone = doubles(&file, "Ozone Concentration (ppb)");
    assert_eq!(ozone[1], 32.25);
    assert!(ozone[2].is_nan());

    let qc = file.variable("Quality Control Falg Value").unwrap();
    assert_eq!(qc.get_values::<i64, _>(..).unwrap(), vec![0, 2, 1, 0]);
    match qc.attribute("flag_values").unwrap().value().unwrap() {
        AttributeValue::Longlongs(v) => assert_eq!(v, vec![0, 1, 2]),
        other => panic!("unexpected flag_values {other:?}"),
    }
    assert_eq!(
        text_attr(qc.attribute("flag_meanings")),
        "good_data missing_value instrument_fault"
    );
}

#[test]
fn test_missing_input() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.nc");

    let err = run(&dir.path().join("nope.csv"), &output, 0).unwrap_err();
    match &err {
        ConversionError::Input { source, .. } => {
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
        }
        other => panic!("expected input error, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_ragged_csv() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "r.csv", "a,b\n1,2\n3,4,5\n");
    let output = dir.path().join("r.nc");

    let err = run(&input, &output, 0).unwrap_err();
    assert!(matches!(err, ConversionError::Parse { .. }), "{err:?}");
    assert!(err.to_string().contains("line 3"), "{err}");
    assert!(!output.exists());
}

#[test]
fn test_bad_time_column_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "a.csv", "when,v\nlater,1\n");
    let output = dir.path().join("a.nc");
    let options = ConvertOptions { time_column: Some("when".into()), ..Default::default() };

    let err = convert(&input, &output, &options).unwrap_err();
    assert!(matches!(err, ConversionError::Column { .. }), "{err:?}");
    assert!(!output.exists());
}

#[test]
fn test_unwritable_output() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "a.csv", "a\n1\n");
    let output = dir.path().join("no_such_dir").join("a.nc");

    let err = run(&input, &output, 0).unwrap_err();
    assert!(matches!(err, ConversionError::Write { .. }), "{err:?}");
    assert!(!output.exists());
}

#[test]
fn test_failure_after_create_removes_partial_file() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "a.csv", "a,b\n1,2\n");
    let output = dir.path().join("a.nc");
    // '/' is illegal in netCDF names, so add_dimension fails once the file exists
    let options = ConvertOptions { dimension: Some("bad/name".into()), ..Default::default() };

    let err = convert(&input, &output, &options).unwrap_err();
    assert!(matches!(err, ConversionError::Write { .. }), "{err:?}");
    assert!(!output.exists());
}

#[test]
fn test_long_header_is_clipped_to_a_legal_name() {
    let dir = TempDir::new().unwrap();
    let header = "h".repeat(300);
    let input = write_csv(&dir, "long.csv", &format!("{header},{header}\n1,2\n"));
    let output = dir.path().join("long.nc");

    run(&input, &output, 0).unwrap();

    let file = netcdf::open(&output).unwrap();
    assert_eq!(file.variables().count(), 2);
    let first = "h".repeat(256);
    let second = format!("{}_1", "h".repeat(254));
    assert_eq!(ints(&file, &first), vec![1]);
    assert_eq!(ints(&file, &second), vec![2]);
    let var = file.variable(&first).unwrap();
    assert_eq!(text_attr(var.attribute("long_name")), header);
}

#[test]
fn test_skiprows_with_cr_line_endings() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(&dir, "mac.csv", "note one\rnote two\rx\r5\r6\r");
    let output = dir.path().join("mac.nc");

    run(&input, &output, 2).unwrap();

    let file = netcdf::open(&output).unwrap();
    assert_eq!(ints(&file, "x"), vec![5, 6]);
    assert_eq!(text_attr(file.attribute("header_1")), "note two");
}
