//! Rendering of experiment records as text, spreadsheet and CSV.
//!
//! Rows are written in the order the records were given; nothing here
//! sorts, filters or deduplicates.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::error::ReportWriteError;
use crate::record::ExperimentRecord;

pub const HEADER: [&str; 6] = [
    "Neurons in hidden layer",
    "Activation function",
    "Updater",
    "F1 score",
    "Accuracy",
    "Recall",
];

pub const SHEET_NAME: &str = "Results";

const REPORT_FILENAME_PREFIX: &str = "results_";
/// Fixed width and most significant field first, so names sort by time.
const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S_%3f";
const SPREADSHEET_EXTENSION: &str = "xlsx";

/// One value in a report row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(value) => write!(f, "{}", value),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    records: Vec<ExperimentRecord>,
}

impl Report {
    pub fn new(records: Vec<ExperimentRecord>) -> Self {
        Report { records }
    }

    pub fn records(&self) -> &[ExperimentRecord] {
        &self.records
    }

    /// Data rows under [`HEADER`], one per record.
    pub fn rows(&self) -> Vec<[Cell; 6]> {
        self.records
            .iter()
            .map(|record| {
                [
                    Cell::Number(record.hidden_neurons as f64),
                    Cell::Text(record.activation.to_string()),
                    Cell::Text(record.updater_name().to_string()),
                    Cell::Number(record.f1()),
                    Cell::Number(record.accuracy()),
                    Cell::Number(record.recall()),
                ]
            })
            .collect()
    }

    /// Every record's information text, separated by blank lines.
    pub fn render_text(&self) -> String {
        self.records
            .iter()
            .map(ExperimentRecord::information_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Writes a single-sheet workbook with a bold header row.
    pub fn write_spreadsheet(&self, path: &Path) -> Result<(), ReportWriteError> {
        let spreadsheet_error = |source| ReportWriteError::Spreadsheet {
            path: path.to_path_buf(),
            source,
        };

        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME).map_err(spreadsheet_error)?;

        for (col, title) in HEADER.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, *title, &bold)
                .map_err(spreadsheet_error)?;
        }
        for (index, row) in self.rows().iter().enumerate() {
            let row_number = index as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Number(value) => worksheet.write_number(row_number, col, *value),
                    Cell::Text(text) => worksheet.write_string(row_number, col, text.as_str()),
                }
                .map_err(spreadsheet_error)?;
            }
        }
        worksheet.autofit();

        workbook.save(path).map_err(spreadsheet_error)?;
        info!(path = %path.display(), rows = self.records.len(), "spreadsheet report written");
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ReportWriteError> {
        let csv_error = |source| ReportWriteError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        writer.write_record(HEADER).map_err(csv_error)?;
        for row in self.rows() {
            writer
                .write_record(row.iter().map(|cell| cell.to_string()))
                .map_err(csv_error)?;
        }
        writer
            .flush()
            .map_err(|e| csv_error(csv::Error::from(e)))?;
        info!(path = %path.display(), rows = self.records.len(), "csv report written");
        Ok(())
    }
}

/// `<directory>/results_YYYY_MM_DD_HH_MM_SS_mmm.xlsx` for the time `at`.
pub fn timestamped_path(directory: &Path, at: NaiveDateTime) -> PathBuf {
    directory.join(format!(
        "{}{}.{}",
        REPORT_FILENAME_PREFIX,
        at.format(TIMESTAMP_FORMAT),
        SPREADSHEET_EXTENSION
    ))
}
