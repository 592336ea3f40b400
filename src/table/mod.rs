use std::collections::HashSet;

use crate::errors::CovError;

pub mod reader;

/// Row/column-labeled numeric matrix read from the coverage spreadsheet.
/// Rows are test cases, columns are modules. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageTable {
    row_labels: Vec<String>,
    col_labels: Vec<String>,
    cells: Vec<Vec<f64>>,
}

impl CoverageTable {
    pub fn new(
        row_labels: Vec<String>,
        col_labels: Vec<String>,
        cells: Vec<Vec<f64>>,
    ) -> Result<Self, CovError> {
        if cells.len() != row_labels.len() {
            return Err(CovError::Validation(format!(
                "Expected {} data rows, got {}",
                row_labels.len(),
                cells.len()
            )));
        }
        for (label, row) in row_labels.iter().zip(&cells) {
            if row.len() != col_labels.len() {
                return Err(CovError::Validation(format!(
                    "Row '{}' has {} cells, expected {}",
                    label,
                    row.len(),
                    col_labels.len()
                )));
            }
        }
        ensure_unique(&row_labels, "row")?;
        ensure_unique(&col_labels, "column")?;

        Ok(Self {
            row_labels,
            col_labels,
            cells,
        })
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[String] {
        &self.col_labels
    }

    pub fn cell(&self, row: usize, col: usize) -> f64 {
        self.cells[row][col]
    }

    /// (rows, columns), header and label column excluded.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_labels.len(), self.col_labels.len())
    }

    /// Smallest and largest cell value; used to normalize the heatmap
    /// color scale. `None` for an empty table.
    pub fn value_span(&self) -> Option<(f64, f64)> {
        let mut values = self.cells.iter().flatten();
        let first = *values.next()?;
        let mut span = (first, first);
        for &value in values {
            span.0 = span.0.min(value);
            span.1 = span.1.max(value);
        }
        Some(span)
    }

    /// Mean over every cell. NaN for an empty table, matching the
    /// convention of the spreadsheet tooling this data comes from.
    pub fn overall_mean(&self) -> f64 {
        let count = self.row_labels.len() * self.col_labels.len();
        let sum: f64 = self.cells.iter().flatten().sum();
        sum / count as f64
    }

    /// Per-column summary statistics.
    pub fn describe(&self) -> SummaryStats {
        let mut columns = Vec::with_capacity(self.col_labels.len());
        for (index, label) in self.col_labels.iter().enumerate() {
            let values: Vec<f64> = self.cells.iter().map(|row| row[index]).collect();
            columns.push(ColumnStats::from_values(label.clone(), &values));
        }
        SummaryStats { columns }
    }

    /// Full table in the report's markup dialect.
    pub fn to_latex(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "\\begin{{tabular}}{{l{}}}\n",
            "r".repeat(self.col_labels.len())
        ));
        out.push_str("\\toprule\n");
        out.push_str(&header_row(&self.col_labels));
        out.push_str("\\midrule\n");
        for (label, row) in self.row_labels.iter().zip(&self.cells) {
            let cells: Vec<String> = row.iter().map(|v| format_number(*v)).collect();
            out.push_str(&format!(
                "{} & {} \\\\\n",
                latex_escape(label),
                cells.join(" & ")
            ));
        }
        out.push_str("\\bottomrule\n\\end{tabular}\n");
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    fn from_values(label: String, values: &[f64]) -> Self {
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        // Sample standard deviation; a single observation has no spread.
        let std = if count > 1 {
            let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Self {
            label,
            count,
            mean,
            std,
            min,
            max,
        }
    }
}

/// Summary block rendered into the report, one column per module.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub columns: Vec<ColumnStats>,
}

impl SummaryStats {
    pub fn to_latex(&self) -> String {
        let labels: Vec<String> = self.columns.iter().map(|c| c.label.clone()).collect();
        let mut out = String::new();
        out.push_str(&format!(
            "\\begin{{tabular}}{{l{}}}\n",
            "r".repeat(self.columns.len())
        ));
        out.push_str("\\toprule\n");
        out.push_str(&header_row(&labels));
        out.push_str("\\midrule\n");
        out.push_str(&self.stat_row("count", |c| c.count as f64));
        out.push_str(&self.stat_row("mean", |c| c.mean));
        out.push_str(&self.stat_row("std", |c| c.std));
        out.push_str(&self.stat_row("min", |c| c.min));
        out.push_str(&self.stat_row("max", |c| c.max));
        out.push_str("\\bottomrule\n\\end{tabular}\n");
        out
    }

    fn stat_row(&self, name: &str, pick: impl Fn(&ColumnStats) -> f64) -> String {
        let cells: Vec<String> = self.columns.iter().map(|c| format_number(pick(c))).collect();
        format!("{} & {} \\\\\n", name, cells.join(" & "))
    }
}

fn header_row(labels: &[String]) -> String {
    let escaped: Vec<String> = labels.iter().map(|l| latex_escape(l)).collect();
    format!(" & {} \\\\\n", escaped.join(" & "))
}

fn ensure_unique(labels: &[String], axis: &str) -> Result<(), CovError> {
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(CovError::Validation(format!(
                "Duplicate {} label: '{}'",
                axis, label
            )));
        }
    }
    Ok(())
}

/// Escape the LaTeX special characters that show up in sheet labels.
pub fn latex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("\\&"),
            '%' => out.push_str("\\%"),
            '$' => out.push_str("\\$"),
            '#' => out.push_str("\\#"),
            '_' => out.push_str("\\_"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            _ => out.push(ch),
        }
    }
    out
}

/// Fixed-precision rendering with trailing zeros trimmed, so repeated runs
/// produce byte-identical reports.
pub fn format_number(value: f64) -> String {
    let mut text = format!("{:.6}", value);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}
