use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dictionary_diff::config::DiffConfig;
use dictionary_diff::dataset::Dataset;
use dictionary_diff::{build_merged_view, diff};
use encoding_rs::UTF_8;
use tempfile::TempDir;

const FORMS: [&str; 4] = ["demographics", "vitals", "labs", "follow_up"];

fn write_dictionary(dir: &Path, name: &str, rows: usize, revision: usize) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).expect("create csv");
    writeln!(
        file,
        "Variable / Field Name,Form Name,Field Type,Field Label,\"Choices, Calculations, OR Slider Labels\""
    )
    .expect("header");
    for i in 0..rows {
        // Every revision drops and adds a slice of fields and edits every 7th.
        if revision > 0 && i % 50 == 0 {
            continue;
        }
        let form = FORMS[i % FORMS.len()];
        let field_type = if revision > 0 && i % 7 == 0 { "dropdown" } else { "radio" };
        writeln!(
            file,
            "field_{i},{form},{field_type},Question {i},\"1, Yes | 2, No | 3, Unknown\""
        )
        .expect("row");
    }
    if revision > 0 {
        for i in 0..rows / 50 {
            writeln!(file, "added_{i},labs,text,Added {i},").expect("row");
        }
    }
    path
}

fn generate_pair(rows: usize) -> (TempDir, Dataset, Dataset) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let old_path = write_dictionary(temp_dir.path(), "old.csv", rows, 0);
    let new_path = write_dictionary(temp_dir.path(), "new.csv", rows, 1);
    let old = Dataset::load(&old_path, b',', UTF_8).expect("load old");
    let new = Dataset::load(&new_path, b',', UTF_8).expect("load new");
    (temp_dir, old, new)
}

fn bench_diff(c: &mut Criterion) {
    let (temp_dir, old, new) = generate_pair(20_000);
    let config = DiffConfig::default();

    let mut group = c.benchmark_group("dictionary_diff");

    group.bench_function("change_set", |b| {
        b.iter_batched(
            || (),
            |_| {
                diff(&old, &new, &config).expect("diff");
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("merged_view", |b| {
        b.iter_batched(
            || (),
            |_| {
                build_merged_view(&old, &new, &config).expect("merged view");
            },
            BatchSize::SmallInput,
        );
    });

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_diff);
criterion_main!(benches);
