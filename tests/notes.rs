mod common;

use common::{CHOICES, FORM, KEY, LABEL, dictionary};
use dictionary_diff::{
    build_merged_view,
    config::DiffConfig,
    notes::{ChangeType, JoinSide},
};

const COLUMNS: [&str; 3] = [KEY, FORM, LABEL];

#[test]
fn masks_unmodified_cells_with_placeholder() {
    let old = dictionary(&COLUMNS, &[&["age", "Demographics", "Age"]]);
    let new = dictionary(&COLUMNS, &[&["age", "Demographics", "Age (years)"]]);

    let view = build_merged_view(&old, &new, &DiffConfig::default()).expect("merged view");

    assert_eq!(view.columns, vec![FORM.to_string(), LABEL.to_string()]);
    let entry = view.entry("age").expect("age entry");
    assert_eq!(entry.change_type, ChangeType::Modified);
    assert_eq!(entry.side, JoinSide::Both);

    let form = view.cell("age", FORM).unwrap();
    assert!(!form.modified);
    assert_eq!(form.old_value, "N/A");
    assert_eq!(form.new_value, "N/A");

    let label = view.cell("age", LABEL).unwrap();
    assert!(label.modified);
    assert_eq!(label.old_value, "Age");
    assert_eq!(label.new_value, "Age (years)");
}

#[test]
fn separator_spacing_does_not_count_as_modification() {
    let columns = [KEY, FORM, CHOICES];
    let old = dictionary(&columns, &[&["smoker", "Habits", "1,A|2,B"]]);
    let new = dictionary(&columns, &[&["smoker", "Habits", "1, A | 2, B"]]);

    let view = build_merged_view(&old, &new, &DiffConfig::default()).expect("merged view");
    assert!(view.entries.is_empty());
}

#[test]
fn one_sided_fields_are_new_or_removed_and_fully_masked() {
    let old = dictionary(&COLUMNS, &[&["gone", "Labs", "Old field"]]);
    let new = dictionary(&COLUMNS, &[&["fresh", "Labs", "New field"]]);

    let view = build_merged_view(&old, &new, &DiffConfig::default()).expect("merged view");

    let fresh = view.entry("fresh").expect("new entry");
    assert_eq!(fresh.change_type, ChangeType::New);
    assert_eq!(fresh.side, JoinSide::NewOnly);
    let gone = view.entry("gone").expect("removed entry");
    assert_eq!(gone.change_type, ChangeType::Removed);
    assert_eq!(gone.form, "Labs");
    for entry in [fresh, gone] {
        assert!(entry.cells.iter().all(|cell| !cell.modified
            && cell.old_value == "N/A"
            && cell.new_value == "N/A"));
    }
}

#[test]
fn entries_group_by_form_then_join_order() {
    let new = dictionary(
        &COLUMNS,
        &[
            &["b1", "Demographics", "x"],
            &["a1", "Labs", "y"],
        ],
    );
    let old = dictionary(
        &COLUMNS,
        &[
            &["a1", "Labs", "y-old"],
            &["b1", "Demographics", "x-old"],
            &["z1", "Archive", "z"],
            &["c0", "Demographics", "c"],
        ],
    );

    let view = build_merged_view(&old, &new, &DiffConfig::default()).expect("merged view");

    let order = view
        .entries
        .iter()
        .map(|entry| entry.field.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["b1", "c0", "a1", "z1"]);
    let merged = view
        .entries
        .iter()
        .map(|entry| entry.merged_index)
        .collect::<Vec<_>>();
    assert_eq!(merged, vec![1, 2, 0, 3]);
}

#[test]
fn form_falls_back_to_old_when_new_is_blank() {
    let old = dictionary(&COLUMNS, &[&["age", "Demographics", "Age"]]);
    let new = dictionary(&COLUMNS, &[&["age", "", "Age"]]);

    let view = build_merged_view(&old, &new, &DiffConfig::default()).expect("merged view");
    let entry = view.entry("age").expect("form changed");
    assert_eq!(entry.form, "Demographics");
    assert!(view.cell("age", FORM).unwrap().modified);
}

#[test]
fn rows_follow_header_layout() {
    let old = dictionary(&COLUMNS, &[&["age", "Demographics", "Age"]]);
    let new = dictionary(&COLUMNS, &[&["age", "Demographics", "Years"]]);
    let mut config = DiffConfig::default();
    config.placeholder = "-".to_string();

    let view = build_merged_view(&old, &new, &config).expect("merged view");

    assert_eq!(
        view.headers(),
        vec![
            "VARIABLE",
            "FORM_NAME",
            "CHANGE_TYPE",
            "MODIFIED: Form Name",
            "MODIFIED_OLD_VALUE: Form Name",
            "MODIFIED_NEW_VALUE: Form Name",
            "MODIFIED: Field Label",
            "MODIFIED_OLD_VALUE: Field Label",
            "MODIFIED_NEW_VALUE: Field Label",
        ]
    );
    assert_eq!(
        view.to_rows(),
        vec![vec![
            "age",
            "Demographics",
            "Modified",
            "0",
            "-",
            "-",
            "1",
            "Age",
            "Years",
        ]]
    );
}

#[test]
fn columns_missing_from_old_compare_as_null() {
    let old = dictionary(&[KEY, FORM], &[&["age", "Demographics"], &["dob", "Demographics"]]);
    let new = dictionary(
        &COLUMNS,
        &[&["age", "Demographics", ""], &["dob", "Demographics", "Date of birth"]],
    );

    let view = build_merged_view(&old, &new, &DiffConfig::default()).expect("merged view");

    let age = view.cell("age", LABEL).expect("age entry");
    assert!(age.modified);
    assert_eq!(age.old_value, "");
    assert_eq!(age.new_value, "");
    assert!(view.cell("dob", LABEL).unwrap().modified);
}
