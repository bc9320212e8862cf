mod common;

use common::{TestWorkspace, dictionary};
use dictionary_diff::{
    DiffError,
    dataset::{Dataset, DuplicateKeyPolicy},
    error::Side,
    io_utils,
};
use encoding_rs::UTF_8;

#[test]
fn load_strips_index_artifacts_and_pads_short_rows() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "dictionary.csv",
        ",Variable,Type,Unnamed: 3\n0,age,text,x\n1,weight\n",
    );

    let dataset = Dataset::load(&path, b',', UTF_8).expect("load dictionary");

    assert_eq!(dataset.columns(), ["Variable", "Type"]);
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.record(0).unwrap().value("Type"), "text");
    assert_eq!(dataset.record(1).unwrap().value("Type"), "");
    assert_eq!(dataset.record(1).unwrap().position(), 2);
}

#[test]
fn load_reads_tab_separated_files() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("dictionary.tsv", "Variable\tLabel\nage\tAge, in years\n");
    let delimiter = io_utils::resolve_input_delimiter(&path, None);
    assert_eq!(delimiter, b'\t');

    let dataset = Dataset::load(&path, delimiter, UTF_8).expect("load tsv");
    assert_eq!(dataset.record(0).unwrap().value("Label"), "Age, in years");
}

#[test]
fn load_decodes_configured_encoding() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("latin1.csv");
    std::fs::write(&path, b"Variable,Label\nbmi,Indice de masse corporelle \xe9\n").unwrap();
    let encoding = io_utils::resolve_encoding(Some("windows-1252")).unwrap();

    let dataset = Dataset::load(&path, b',', encoding).expect("load latin1");
    assert_eq!(
        dataset.record(0).unwrap().value("Label"),
        "Indice de masse corporelle é"
    );
}

#[test]
fn spreadsheets_are_rejected() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("dictionary.xlsx", "not really a workbook");
    let err = Dataset::load(&path, b',', UTF_8).unwrap_err();
    assert!(err.to_string().contains("Unsupported input format '.xlsx'"));
}

#[test]
fn distinct_values_keep_first_seen_order() {
    let dataset = dictionary(
        &["Variable", "Form Name"],
        &[
            &["a", "Labs"],
            &["b", "Demographics"],
            &["c", "Labs"],
            &["d", "Vitals"],
        ],
    );
    assert_eq!(
        dataset.distinct_values("Form Name"),
        vec!["Labs", "Demographics", "Vitals"]
    );
    assert!(dataset.distinct_values("Missing").is_empty());
}

#[test]
fn key_index_applies_duplicate_policy() {
    let dataset = dictionary(
        &["Variable", "Type"],
        &[&["age", "text"], &["dob", "date"], &["age", "integer"]],
    );

    let index = dataset
        .key_index("Variable", Side::New, DuplicateKeyPolicy::FirstMatch)
        .expect("first match index");
    assert_eq!(index.get("age"), Some(0));
    assert_eq!(index.len(), 2);
    assert_eq!(index.duplicates(), 1);

    let err = dataset
        .key_index("Variable", Side::New, DuplicateKeyPolicy::Fail)
        .unwrap_err();
    assert_eq!(
        err,
        DiffError::DuplicateKey {
            dataset: Side::New,
            key: "age".into(),
            first: 1,
            second: 3
        }
    );
    assert_eq!(
        err.to_string(),
        "Duplicate key 'age' in new dataset at rows 1 and 3"
    );
}

#[test]
fn missing_cells_read_as_empty() {
    let dataset = Dataset::new(
        vec!["Variable".into(), "Type".into(), "Note".into()],
        vec![vec!["age".into()]],
    );
    let record = dataset.record(0).unwrap();
    assert_eq!(record.values().len(), 3);
    assert_eq!(record.value("Note"), "");
    assert_eq!(record.get("Absent"), None);
    assert!(dataset.record(1).is_none());
}
