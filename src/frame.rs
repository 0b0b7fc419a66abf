//! Row source for files: loads a csv / parquet / arrow file into [`Record`]s and infers a column
//! model from the schema.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use derive_setters::Setters;
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::column::{ColumnDef, FilterMode};
use crate::domain::TableError;
use crate::value::{CellValue, parse_date};

const COLUMN_WIDTH_MARGIN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Parquet,
    Arrow,
}

/// One loaded row. Cells are in the order of the file's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: String,
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct LoadOptions {
    /// A text column with at most this many distinct values gets a select filter.
    pub select_max_distinct: usize,
    pub max_column_width: u32,
    /// Column whose values identify rows. Row numbers are used when unset or missing.
    #[setters(strip_option, into)]
    pub key_column: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            select_max_distinct: 12,
            max_column_width: 40,
            key_column: None,
        }
    }
}

#[derive(Debug)]
pub struct LoadedTable {
    pub name: String,
    pub records: Vec<Record>,
    pub columns: Vec<ColumnDef<Record>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Number,
    Date,
    Bool,
    Text,
}

struct LoadedColumn {
    name: String,
    kind: Kind,
    cells: Vec<CellValue>,
    max_width: usize,
    distinct: usize,
}

pub fn load_table(
    path: impl Into<PathBuf>,
    options: &LoadOptions,
) -> Result<LoadedTable, TableError> {
    let path = path.into();
    let file_type = file_info(&path)?;
    let frame = match file_type {
        FileType::Csv => load_csv(&path)?,
        FileType::Parquet => load_parquet(&path)?,
        FileType::Arrow => load_arrow(&path)?,
    };

    let start_time = Instant::now();
    let df = frame.collect()?;
    // Each column is converted in its own task.
    let loaded: Result<Vec<LoadedColumn>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let loaded = loaded?;
    info!(
        "Loading {} took {}ms",
        path.display(),
        start_time.elapsed().as_millis()
    );

    let nrows = df.height();
    let key_idx = options
        .key_column
        .as_ref()
        .and_then(|key| loaded.iter().position(|c| &c.name == key));
    let records: Vec<Record> = (0..nrows)
        .map(|ridx| Record {
            key: match key_idx {
                Some(cidx) => loaded[cidx].cells[ridx].display(),
                None => ridx.to_string(),
            },
            cells: loaded.iter().map(|c| c.cells[ridx].clone()).collect(),
        })
        .collect();

    let columns = loaded
        .iter()
        .enumerate()
        .map(|(idx, c)| column_def(idx, c, nrows, options))
        .collect();

    Ok(LoadedTable {
        name: path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string(),
        records,
        columns,
    })
}

fn column_def(
    idx: usize,
    column: &LoadedColumn,
    nrows: usize,
    options: &LoadOptions,
) -> ColumnDef<Record> {
    let filter_mode = match column.kind {
        Kind::Number => FilterMode::NumberRange,
        Kind::Date => FilterMode::DateRange,
        Kind::Bool => FilterMode::Select,
        Kind::Text
            if column.distinct <= options.select_max_distinct && column.distinct < nrows =>
        {
            FilterMode::Select
        }
        Kind::Text => FilterMode::Text,
    };
    let width =
        (column.name.chars().count().max(column.max_width) + COLUMN_WIDTH_MARGIN) as u32;
    debug!(
        "Column {} \"{}\": {:?}, {:?}, width {}",
        idx, column.name, column.kind, filter_mode, width
    );
    ColumnDef::new(column.name.clone(), column.name.clone(), move |r: &Record| {
        r.cells.get(idx).cloned().unwrap_or_default()
    })
    .with_filter_mode(filter_mode)
    .with_initial_width(width.min(options.max_column_width))
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn load_column(df: &DataFrame, name: &str) -> Result<LoadedColumn, PolarsError> {
    let column = df.column(name)?;
    let dtype = column.dtype().clone();
    let text = column.cast(&DataType::String)?;
    let raw: Vec<Option<String>> = text
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")))
        .collect();

    let kind = if is_numeric_type(&dtype) {
        Kind::Number
    } else if matches!(dtype, DataType::Date | DataType::Datetime(_, _)) {
        Kind::Date
    } else if dtype == DataType::Boolean {
        Kind::Bool
    } else if raw.iter().flatten().any(|s| !s.is_empty())
        && raw
            .iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .all(|s| parse_date(s).is_some())
    {
        Kind::Date
    } else {
        Kind::Text
    };

    let cells: Vec<CellValue> = raw
        .iter()
        .map(|v| match v.as_deref() {
            None | Some("") => CellValue::Empty,
            Some(s) => match kind {
                Kind::Number => s.parse::<f64>().map(CellValue::Number).unwrap_or_default(),
                Kind::Date => CellValue::from(parse_date(s.get(..10).unwrap_or(s))),
                Kind::Bool => CellValue::Bool(s == "true"),
                Kind::Text => CellValue::from(s),
            },
        })
        .collect();

    let max_width = raw
        .iter()
        .flatten()
        .map(|s| s.chars().count())
        .max()
        .unwrap_or(0);
    let distinct = raw.iter().flatten().collect::<HashSet<_>>().len();

    Ok(LoadedColumn {
        name: name.to_string(),
        kind,
        cells,
        max_width,
        distinct,
    })
}

fn file_info(path: &Path) -> Result<FileType, TableError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TableError::FileNotFound,
        ErrorKind::PermissionDenied => TableError::PermissionDenied,
        _ => TableError::Io(e),
    })?;
    if !metadata.is_file() {
        return Err(TableError::LoadingFailed("Not a file!".into()));
    }
    detect_file_type(path)
}

pub fn detect_file_type(path: &Path) -> Result<FileType, TableError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::Csv),
        Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
        _ => Err(TableError::UnknownFileType),
    }
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
