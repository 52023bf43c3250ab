//! Paths to small, checked-in CSV sample files for `concur-csv`'s tests.

use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
}

/// Directory containing one header file (`header.csv`) and two data
/// files (`part-0.csv`, `part-1.csv`), matching the `name:string,
/// age:long, score:double, tags:string[]` schema.
#[must_use]
pub fn csv_sample_dir() -> PathBuf {
    fixtures_dir()
}

/// The header file alone.
#[must_use]
pub fn csv_header_file() -> PathBuf {
    fixtures_dir().join("header.csv")
}

/// All data files alone, header excluded.
#[must_use]
pub fn csv_data_files() -> Vec<PathBuf> {
    vec![fixtures_dir().join("part-0.csv"), fixtures_dir().join("part-1.csv")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_paths_exist_on_disk() {
        assert!(Path::new(&csv_header_file()).is_file());
        for file in csv_data_files() {
            assert!(file.is_file());
        }
    }
}
