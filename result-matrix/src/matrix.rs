//! Pivot of [`BenchmarkResult`]s into a [`ResultMatrix`].
//!
//! Layout rules:
//!
//! - The first column holds labels: `Units: <unit>` in the header, benchmark names below.
//!   It is left-justified and as wide as its longest entry.
//! - Every other column is one value of the pivot parameter. All of them share one width:
//!   the longest parameter value or formatted score. Cells are right-justified and
//!   preceded by two spaces.
//! - Scores are rounded half-up to an integer.
//!
//! Columns are the parameter values of the *first* benchmark name encountered, sorted as strings
//! (so `"10"` comes before `"2"`). The other rows list their own scores in their own sort order
//! below those headers, i.e., positionally. If a benchmark has a different set of parameter values
//! than the first one, its cells end up under headers that don't belong to them. Rows are padded
//! with blank cells or cut off to match the header.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use tracing::debug;

use crate::{BenchmarkResult, Error};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMatrix {
    unit: String,
    columns: Vec<String>,
    rows: Vec<MatrixRow>,
    label_width: usize,
    value_width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRow {
    pub name: String,
    /// One per column; blank where the benchmark has fewer results than there are columns.
    pub cells: Vec<String>,
}

/// Pivot `results` on the parameter `group_by`.
///
/// Fails with [`Error::UnsupportedShape`] if the results use more than one parameter key between them,
/// and with [`Error::MissingParameter`] if a result lacks `group_by`.
/// Empty input yields an empty matrix.
pub fn format_as_matrix(results: &[BenchmarkResult], group_by: &str) -> Result<ResultMatrix, Error> {
    let Some(first) = results.first() else {
        return Ok(ResultMatrix::default());
    };

    let keys: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.params.keys().map(String::as_str))
        .collect();
    if keys.len() > 1 {
        return Err(Error::UnsupportedShape {
            keys: keys.into_iter().map(str::to_owned).collect(),
        });
    }

    // groups in order of first appearance of the benchmark name
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<(&str, f64)>)> = Vec::new();
    for result in results {
        let value = result
            .param(group_by)
            .ok_or_else(|| Error::MissingParameter {
                benchmark: result.name.clone(),
                param: group_by.to_owned(),
            })?;
        let idx = *index.entry(result.name.as_str()).or_insert_with(|| {
            groups.push((result.name.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[idx].1.push((value, result.score));
    }
    for (_, entries) in &mut groups {
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    }

    let columns: Vec<String> = groups[0].1.iter().map(|(v, _)| (*v).to_owned()).collect();

    let rows: Vec<MatrixRow> = groups
        .iter()
        .map(|(name, entries)| {
            let diverges = entries.len() != columns.len()
                || entries.iter().zip(&columns).any(|((v, _), c)| *v != c.as_str());
            if diverges {
                debug!(
                    benchmark = *name,
                    "parameter values differ from the first benchmark's, cells are placed positionally"
                );
            }
            let cells = entries
                .iter()
                .map(|(_, score)| format_score(*score))
                .chain(std::iter::repeat(String::new()))
                .take(columns.len())
                .collect();
            MatrixRow {
                name: (*name).to_owned(),
                cells,
            }
        })
        .collect();

    let unit = first.score_unit.clone();
    let label_width = rows
        .iter()
        .map(|r| width(&r.name))
        .chain(std::iter::once(width(&unit_label(&unit))))
        .max()
        .unwrap_or(0);
    let value_width = results
        .iter()
        .filter_map(|r| r.param(group_by))
        .map(width)
        .chain(rows.iter().flat_map(|r| r.cells.iter().map(|c| width(c))))
        .max()
        .unwrap_or(0);

    Ok(ResultMatrix {
        unit,
        columns,
        rows,
        label_width,
        value_width,
    })
}

/// Round half-up and render without separators or decimals.
fn format_score(score: f64) -> String {
    if !score.is_finite() {
        return score.to_string();
    }
    // `score + 0.5` is inexact for values just below a half and for large integers
    let floor = score.floor();
    let rounded = if score - floor >= 0.5 { floor + 1.0 } else { floor };
    // `+ 0.0` turns -0.0 into 0.0
    format!("{:.0}", rounded + 0.0)
}

fn unit_label(unit: &str) -> String {
    format!("Units: {unit}")
}

fn width(s: &str) -> usize {
    s.chars().count()
}

impl ResultMatrix {
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The pivot parameter values, in display order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    /// The label cell followed by the column values.
    pub fn header(&self) -> Vec<String> {
        if self.is_empty() {
            return Vec::new();
        }
        std::iter::once(unit_label(&self.unit))
            .chain(self.columns.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn write_line<'a>(
        &self,
        f: &mut fmt::Formatter<'_>,
        label: &str,
        cells: impl Iterator<Item = &'a String>,
    ) -> fmt::Result {
        write!(f, "{label:<width$}", width = self.label_width)?;
        for cell in cells {
            write!(f, "  {cell:>width$}", width = self.value_width)?;
        }
        writeln!(f)
    }
}

impl fmt::Display for ResultMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        self.write_line(f, &unit_label(&self.unit), self.columns.iter())?;
        for row in &self.rows {
            self.write_line(f, &row.name, row.cells.iter())?;
        }
        Ok(())
    }
}
