//! Distinct calendar years in the signal dataset's `date` column.

use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::{DataError, SignalSchema};

/// Read the parquet file at `path`, check its schema, and return its years ascending.
pub fn discover_years(path: &Path) -> Result<BTreeSet<i32>, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }
    let parquet_err = |message: String| DataError::ParquetError {
        path: path.to_path_buf(),
        message,
    };

    let file = fs::File::open(path).map_err(|e| parquet_err(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| parquet_err(format!("read: {e}")))?;

    SignalSchema::validate(&df).map_err(|source| DataError::Schema {
        path: path.to_path_buf(),
        source,
    })?;

    let years = years_in_frame(&df).map_err(|e| parquet_err(format!("date column: {e}")))?;
    tracing::debug!(path = %path.display(), rows = df.height(), years = years.len(), "discovered years");
    Ok(years)
}

/// Years present in `df["date"]`. Null dates are skipped.
pub fn years_in_frame(df: &DataFrame) -> PolarsResult<BTreeSet<i32>> {
    let dates = df.column("date")?.cast(&DataType::Date)?;
    let date_ca = dates.date()?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let mut years = BTreeSet::new();
    for i in 0..date_ca.len() {
        if let Some(days) = date_ca.get(i) {
            years.insert((epoch + Duration::days(i64::from(days))).year());
        }
    }
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(y: i32, m: u32, d: u32) -> i32 {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        (NaiveDate::from_ymd_opt(y, m, d).unwrap() - epoch).num_days() as i32
    }

    fn signal_frame(dates: Vec<Option<i32>>) -> DataFrame {
        let n = dates.len();
        DataFrame::new(vec![
            Column::new("date".into(), dates)
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("barrid".into(), vec!["USA06Z1"; n]),
            Column::new("alpha".into(), vec![0.01; n]),
            Column::new("predicted_beta".into(), vec![1.0; n]),
        ])
        .unwrap()
    }

    fn write(df: &mut DataFrame, path: &Path) {
        let file = fs::File::create(path).unwrap();
        ParquetWriter::new(file).finish(df).unwrap();
    }

    #[test]
    fn years_from_parquet_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.parquet");
        let mut df = signal_frame(vec![
            Some(days(2022, 3, 1)),
            Some(days(2020, 1, 2)),
            Some(days(2021, 6, 30)),
            Some(days(2020, 12, 31)),
        ]);
        write(&mut df, &path);

        let years = discover_years(&path).unwrap();
        assert_eq!(years.into_iter().collect::<Vec<_>>(), vec![2020, 2021, 2022]);
    }

    #[test]
    fn null_dates_are_skipped() {
        let df = signal_frame(vec![Some(days(2019, 5, 1)), None]);
        let years = years_in_frame(&df).unwrap();
        assert_eq!(years.into_iter().collect::<Vec<_>>(), vec![2019]);
    }

    #[test]
    fn datetime_dates_are_supported() {
        let df = DataFrame::new(vec![
            Column::new("date".into(), &[1546300800000i64, 1577836800000])
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .unwrap(),
            Column::new("barrid".into(), &["A", "B"]),
            Column::new("alpha".into(), &[0.1, 0.2]),
            Column::new("predicted_beta".into(), &[1.0, 1.0]),
        ])
        .unwrap();
        let years = years_in_frame(&df).unwrap();
        assert_eq!(years.into_iter().collect::<Vec<_>>(), vec![2019, 2020]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = discover_years(Path::new("/definitely/not/here.parquet")).unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.parquet");
        let mut df = DataFrame::new(vec![Column::new("date".into(), vec![Some(days(2020, 1, 2))])
            .cast(&DataType::Date)
            .unwrap()])
        .unwrap();
        write(&mut df, &path);

        let err = discover_years(&path).unwrap_err();
        assert!(matches!(err, DataError::Schema { .. }));
    }
}
