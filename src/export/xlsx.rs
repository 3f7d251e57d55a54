use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook};

use crate::errors::AppError;
use crate::models::ExchangeRateSet;

pub const REPORT_FILE_NAME: &str = "exchange_rates.xlsx";

/// Write the rates as a single-row spreadsheet inside `dir`.
///
/// Row 1 holds the `<CCY>toEUR` keys, row 2 the rates, columns in the order
/// the rates were fetched. `dir` is created if it does not exist yet.
pub fn build_report(rates: &ExchangeRateSet, dir: &Path) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;

    let path = dir.join(REPORT_FILE_NAME);

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (index, (key, rate)) in rates.iter().enumerate() {
        let col = u16::try_from(index)
            .map_err(|_| AppError::Report(format!("Too many columns: {}", rates.len())))?;
        sheet
            .write_string_with_format(0, col, key, &header)
            .map_err(|e| AppError::Report(format!("Failed to write header {}: {}", key, e)))?;
        sheet
            .write_number(1, col, rate)
            .map_err(|e| AppError::Report(format!("Failed to write rate {}: {}", key, e)))?;
    }

    workbook
        .save(&path)
        .map_err(|e| AppError::Report(format!("Failed to write {}: {}", path.display(), e)))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook};

    fn sample_rates() -> ExchangeRateSet {
        let mut rates = ExchangeRateSet::new();
        rates.insert("USD", 1.0812);
        rates.insert("GBP", 0.8551);
        rates
    }

    #[test]
    fn writes_report_into_new_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("run");

        let path = build_report(&sample_rates(), &dir).unwrap();

        assert_eq!(path, dir.join(REPORT_FILE_NAME));
        let bytes = std::fs::read(&path).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn headers_above_rates_in_fetch_order() {
        let root = tempfile::tempdir().unwrap();
        let path = build_report(&sample_rates(), root.path()).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range("Sheet1").unwrap();

        assert_eq!(range.start(), Some((0, 0)));
        assert_eq!(range.get_size(), (2, 2));
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("USDtoEUR".into())));
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("GBPtoEUR".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0812)));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(0.8551)));
    }

    #[test]
    fn empty_rates_still_produce_a_file() {
        let root = tempfile::tempdir().unwrap();
        let path = build_report(&ExchangeRateSet::new(), root.path()).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn fails_when_directory_cannot_be_created() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let err = build_report(&sample_rates(), &blocker.join("run")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
