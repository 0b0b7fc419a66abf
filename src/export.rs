use std::io::{self, Write};

use polars::prelude::*;
use tracing::debug;

use crate::domain::TableError;
use crate::value::CellValue;

/// Which rows an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportScope {
    /// Every row passing the filters, in display order.
    #[default]
    Filtered,
    CurrentPage,
}

/// Rows ready to hand to a writer: visible data columns in display order, action columns left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub ids: Vec<String>,
    pub headers: Vec<String>,
    pub records: Vec<Vec<CellValue>>,
}

impl ExportTable {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    // Header names must be unique in a frame. Repeated headers fall back to the column id.
    fn column_names(&self) -> Vec<String> {
        self.headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let repeated = self.headers[..idx].contains(header)
                    || self.headers[idx + 1..].contains(header);
                if repeated || header.is_empty() {
                    self.ids[idx].clone()
                } else {
                    header.clone()
                }
            })
            .collect()
    }

    pub fn to_frame(&self) -> Result<DataFrame, TableError> {
        let columns: Vec<Column> = self
            .column_names()
            .into_iter()
            .enumerate()
            .map(|(cidx, name)| {
                let values: Vec<Option<String>> = self
                    .records
                    .iter()
                    .map(|record| {
                        record
                            .get(cidx)
                            .filter(|cell| !cell.is_empty())
                            .map(CellValue::display)
                    })
                    .collect();
                Column::new(name.into(), values)
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

/// Write `table` as delimited text with a header line.
pub fn write_delimited<W: Write>(
    table: &ExportTable,
    writer: &mut W,
    separator: u8,
) -> Result<(), TableError> {
    let mut df = table.to_frame()?;
    CsvWriter::new(writer)
        .include_header(true)
        .with_separator(separator)
        .finish(&mut df)?;
    debug!(
        "Exported {} rows in {} columns",
        table.row_count(),
        table.ids.len()
    );
    Ok(())
}

pub fn to_delimited_string(table: &ExportTable, separator: u8) -> Result<String, TableError> {
    let mut buffer = Vec::new();
    write_delimited(table, &mut buffer, separator)?;
    delimited_text(buffer)
}

fn delimited_text(buffer: Vec<u8>) -> Result<String, TableError> {
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> ExportTable {
        ExportTable {
            ids: vec!["name".into(), "age".into()],
            headers: vec!["Name".into(), "Age".into()],
            records: vec![
                vec![CellValue::from("Ann"), CellValue::Number(30.0)],
                vec![CellValue::from("Smith, Bob"), CellValue::Number(25.5)],
            ],
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let text = to_delimited_string(&table(), b',').unwrap();
        assert_eq!(text, "Name,Age\nAnn,30\n\"Smith, Bob\",25.5\n");
    }

    #[test]
    fn tab_separated() {
        let text = to_delimited_string(&table(), b'\t').unwrap();
        assert_eq!(text.lines().next(), Some("Name\tAge"));
        assert_eq!(text.lines().nth(2), Some("Smith, Bob\t25.5"));
    }

    #[test]
    fn repeated_headers_use_ids() {
        let table = ExportTable {
            ids: vec!["a".into(), "b".into()],
            headers: vec!["Same".into(), "Same".into()],
            records: vec![],
        };
        let text = to_delimited_string(&table, b',').unwrap();
        assert_eq!(text, "a,b\n");
    }

    #[test]
    fn undecodable_output_is_an_io_error() {
        let result = delimited_text(vec![b'a', 0xff, b'\n']);
        assert!(matches!(
            result,
            Err(TableError::Io(e)) if e.kind() == io::ErrorKind::InvalidData
        ));
        assert_eq!(delimited_text(b"a,b\n".to_vec()).unwrap(), "a,b\n");
    }
}
