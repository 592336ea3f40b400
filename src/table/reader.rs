use std::path::Path;

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};

use crate::errors::CovError;
use crate::logging::Logger;

use super::CoverageTable;

/// Read the named sheet into a coverage table. The first row is the header
/// (its corner cell is ignored), the first column holds the row labels.
pub fn read_coverage_table(
    path: &Path,
    sheet_name: &str,
    logger: &Logger,
) -> Result<CoverageTable, CovError> {
    if !path.exists() {
        logger.error(&format!("Spreadsheet does not exist: {}", path.display()));
        return Err(CovError::InputNotFound(path.to_path_buf()));
    }

    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let available = workbook.sheet_names().to_owned();
    logger.info(&format!("Available sheets: {}", available.join(", ")));

    if !available.iter().any(|name| name == sheet_name) {
        logger.error(&format!("Sheet '{}' not found in workbook", sheet_name));
        return Err(CovError::SheetNotFound {
            requested: sheet_name.to_string(),
            available,
        });
    }

    let range = workbook.worksheet_range(sheet_name)?;
    let mut rows = range.rows();

    let header = rows.next().ok_or_else(|| {
        CovError::Validation(format!("Sheet '{}' is empty", sheet_name))
    })?;
    let col_labels = header
        .iter()
        .skip(1)
        .enumerate()
        .map(|(index, cell)| label_of(cell, 0, index + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let mut row_labels = Vec::new();
    let mut cells = Vec::new();
    for (offset, row) in rows.enumerate() {
        let data_row = offset + 1;
        let label_cell = row.first().ok_or_else(|| {
            CovError::Validation(format!("Row {} has no label cell", data_row))
        })?;
        row_labels.push(label_of(label_cell, data_row, 0)?);

        let mut values = Vec::with_capacity(col_labels.len());
        for (index, cell) in row.iter().skip(1).enumerate() {
            let value = cell.as_f64().ok_or_else(|| {
                CovError::Validation(format!(
                    "Non-numeric cell at row {}, column {}: {:?}",
                    data_row,
                    index + 1,
                    cell
                ))
            })?;
            values.push(value);
        }
        cells.push(values);
    }

    let table = CoverageTable::new(row_labels, col_labels, cells)?;
    let (nrows, ncols) = table.shape();
    logger.info(&format!(
        "Spreadsheet read successfully with shape: {} rows x {} columns",
        nrows, ncols
    ));
    Ok(table)
}

fn label_of(cell: &Data, row: usize, col: usize) -> Result<String, CovError> {
    cell.as_string().ok_or_else(|| {
        CovError::Validation(format!("Empty label cell at row {}, column {}", row, col))
    })
}
