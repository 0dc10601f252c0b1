use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::results::ResultRecord;

pub const DELIMITER: char = ';';

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn format_speed(speed_kmh: f64) -> String {
    format!("{speed_kmh:.2} km/h")
}

/// Writes one line per record, in the given order, with no header and no
/// quoting.
pub fn write_csv<W: Write>(records: &[ResultRecord], mut writer: W) -> std::io::Result<()> {
    for record in records {
        writeln!(
            writer,
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            record.rank,
            record.player_name,
            record.team,
            format_speed(record.max_speed_kmh)
        )?;
    }
    writer.flush()
}

pub fn export_to_path(records: &[ResultRecord], path: &Path) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    write_csv(records, BufWriter::new(file)).map_err(io_err)?;
    info!(path = %path.display(), records = records.len(), "results exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(rank: usize, name: &str, team: &str, speed: f64) -> ResultRecord {
        ResultRecord {
            rank,
            player_name: name.to_string(),
            team: team.to_string(),
            max_speed_kmh: speed,
        }
    }

    #[test]
    fn writes_semicolon_rows() {
        let records = vec![record(1, "Alice", "Red", 20.0), record(2, "Bob", "Blue", 7.5)];
        let mut out = Vec::new();
        write_csv(&records, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1;Alice;Red;20.00 km/h\n2;Bob;Blue;7.50 km/h\n"
        );
    }

    #[test]
    fn empty_table_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        export_to_path(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn export_to_path_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        export_to_path(&[record(1, "Alice", "Red", 20.0)], &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "1;Alice;Red;20.00 km/h\n"
        );
    }

    #[test]
    fn unwritable_destination_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.csv");
        let err = export_to_path(&[], &path).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    proptest! {
        #[test]
        fn rows_split_back_into_fields(
            name in "[A-Za-z0-9 ]{1,12}",
            team in "[A-Za-z0-9 ]{1,12}",
            hundredths in 0u32..50_000,
        ) {
            let speed = f64::from(hundredths) / 100.0;
            let records = vec![record(1, &name, &team, speed)];
            let mut out = Vec::new();
            write_csv(&records, &mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            let fields: Vec<&str> = text.trim_end_matches('\n').split(DELIMITER).collect();
            prop_assert_eq!(fields.len(), 4);
            prop_assert_eq!(fields[0], "1");
            prop_assert_eq!(fields[1], name.as_str());
            prop_assert_eq!(fields[2], team.as_str());
            let parsed: f64 = fields[3].trim_end_matches(" km/h").parse().unwrap();
            prop_assert!((parsed - speed).abs() < 1e-9);
        }
    }
}
