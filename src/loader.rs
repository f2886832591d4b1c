//! Tabular file loading.
//!
//! Turns the raw bytes of an uploaded CSV or Excel workbook into a [`Table`]:
//! normalized column names, one [`CellValue`] per cell with every missing
//! marker collapsed into [`CellValue::Missing`], and one [`ColumnType`] label
//! per column.
//!
//! ## Column type precedence
//!
//! Only non-missing cells take part in inference:
//!
//! 1. every cell is an integer → `integer`
//! 2. every cell is an integer or a float → `float`
//! 3. every cell is a boolean → `boolean`
//! 4. every cell is a date or date-time → `datetime`
//! 5. anything else, including a column with no values at all → `text`
//!
//! ## Dates
//!
//! Cells in a `datetime` column are rewritten as ISO-8601
//! (`2024-01-02T00:00:00`); the source text is not kept. Slash dates with the
//! year last are read month first (`01/02/2024` is January 2nd) and dotted
//! dates day first (`01.02.2024` is February 1st). Day-first slash dates
//! above the 12th fail the month-first parse and leave the column as `text`.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::io::Cursor;

use crate::error::{AppError, AppResult};
use crate::models::{ColumnTypes, PreviewRow};

/// Number of leading rows kept as the stored preview.
pub const PREVIEW_ROWS: usize = 10;

/// Strings treated as a missing value when they make up a whole cell.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_LITERALS: &[&str] = &["True", "TRUE", "true"];
const FALSE_LITERALS: &[&str] = &["False", "FALSE", "false"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Comma-separated text
    Csv,
    /// Excel workbook (`.xlsx` or legacy `.xls`)
    Spreadsheet,
}

impl FileKind {
    /// Map a bare file extension (any case) to a format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(FileKind::Csv),
            "xlsx" | "xls" => Some(FileKind::Spreadsheet),
            _ => None,
        }
    }
}

/// Inferred type label of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    DateTime,
    Text,
}

impl ColumnType {
    /// Label stored in the dataset's `data_types` document.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::Text => "text",
        }
    }
}

/// A single parsed cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Missing,
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Text(String),
}

impl CellValue {
    fn kind(&self) -> Option<ColumnType> {
        match self {
            CellValue::Missing => None,
            CellValue::Int(_) => Some(ColumnType::Integer),
            CellValue::Float(_) => Some(ColumnType::Float),
            CellValue::Bool(_) => Some(ColumnType::Boolean),
            CellValue::DateTime(_) => Some(ColumnType::DateTime),
            CellValue::Text(_) => Some(ColumnType::Text),
        }
    }

    /// JSON form used in the preview; missing cells become `""`.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Missing => Value::String(String::new()),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::DateTime(dt) => {
                Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            CellValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// A parsed table
///
/// Rows are streamed once: every cell feeds its column's type tally, and
/// only the leading [`PREVIEW_ROWS`] rows are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub column_types: Vec<ColumnType>,
    /// Number of data rows in the whole file.
    pub total_rows: usize,
    /// Leading rows, each exactly `columns.len()` cells wide.
    pub head: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.total_rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column name → type label, in column order.
    pub fn data_types(&self) -> ColumnTypes {
        self.columns
            .iter()
            .zip(&self.column_types)
            .map(|(name, ty)| (name.clone(), ty.as_str().to_string()))
            .collect()
    }

    /// The first `limit` rows as column name → value mappings.
    pub fn preview(&self, limit: usize) -> Vec<PreviewRow> {
        self.head
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| (name.clone(), cell.to_json()))
                    .collect()
            })
            .collect()
    }
}

/// Running type inference for one column, fed one non-missing cell at a time.
#[derive(Debug, Clone, Copy)]
struct TypeTally {
    seen: bool,
    all_integer: bool,
    all_numeric: bool,
    all_boolean: bool,
    all_datetime: bool,
}

impl Default for TypeTally {
    fn default() -> Self {
        TypeTally {
            seen: false,
            all_integer: true,
            all_numeric: true,
            all_boolean: true,
            all_datetime: true,
        }
    }
}

impl TypeTally {
    fn observe(&mut self, kind: ColumnType) {
        self.seen = true;
        self.all_integer &= kind == ColumnType::Integer;
        self.all_numeric &= matches!(kind, ColumnType::Integer | ColumnType::Float);
        self.all_boolean &= kind == ColumnType::Boolean;
        self.all_datetime &= kind == ColumnType::DateTime;
    }

    fn column_type(&self) -> ColumnType {
        if !self.seen {
            ColumnType::Text
        } else if self.all_integer {
            ColumnType::Integer
        } else if self.all_numeric {
            ColumnType::Float
        } else if self.all_boolean {
            ColumnType::Boolean
        } else if self.all_datetime {
            ColumnType::DateTime
        } else {
            ColumnType::Text
        }
    }
}

/// Parse `bytes` according to `kind`.
///
/// # Errors
/// * Returns `AppError::Parse` for malformed CSV, unreadable workbooks,
///   non-UTF-8 text, or input without a header row
pub fn load_table(bytes: &[u8], kind: FileKind) -> AppResult<Table> {
    match kind {
        FileKind::Csv => from_csv(bytes),
        FileKind::Spreadsheet => from_excel(bytes),
    }
}

/// Load a table from CSV bytes
///
/// The first record is the header. Blank lines are skipped, records shorter
/// than the header are padded with missing cells and longer ones are
/// rejected. Memory use beyond the input is one record plus the kept head.
///
/// # Arguments
/// * `bytes` - Raw file contents, optionally starting with a UTF-8 BOM
///
/// # Returns
/// * `AppResult<Table>` - The parsed table with typed head cells
pub fn from_csv(bytes: &[u8]) -> AppResult<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(str::to_string)
        .collect();
    if header.is_empty() {
        return Err(AppError::Parse("No columns to parse from file".to_string()));
    }
    let width = header.len();

    let mut tallies = vec![TypeTally::default(); width];
    let mut raw_head: Vec<Vec<Option<String>>> = Vec::with_capacity(PREVIEW_ROWS);
    let mut total_rows = 0;
    let mut record = csv::StringRecord::new();

    while reader.read_record(&mut record).map_err(parse_error)? {
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(AppError::Parse(format!(
                "Error tokenizing data. Expected {} fields in line {}, saw {}",
                width,
                line,
                record.len()
            )));
        }

        for (tally, field) in tallies.iter_mut().zip(record.iter()) {
            if !is_missing(field) {
                tally.observe(classify_text(field));
            }
        }

        if raw_head.len() < PREVIEW_ROWS {
            let mut row: Vec<Option<String>> = record.iter().map(missing_or_text).collect();
            row.resize(width, None);
            raw_head.push(row);
        }
        total_rows += 1;
    }

    let column_types: Vec<ColumnType> = tallies.iter().map(TypeTally::column_type).collect();

    let head: Vec<Vec<CellValue>> = raw_head
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&column_types)
                .map(|(raw, ty)| match raw {
                    Some(text) => coerce_text(text, *ty),
                    None => CellValue::Missing,
                })
                .collect()
        })
        .collect();

    Ok(Table {
        columns: normalize_headers(header),
        column_types,
        total_rows,
        head,
    })
}

/// Load a table from an Excel workbook
///
/// Reads the first worksheet; its first row is the header. Integral numbers
/// are treated as integers, error cells as missing. The worksheet range is
/// held by calamine; only the head rows are copied out of it.
///
/// # Arguments
/// * `bytes` - Raw `.xlsx` / `.xls` contents
///
/// # Returns
/// * `AppResult<Table>` - The parsed table with typed cells
pub fn from_excel(bytes: &[u8]) -> AppResult<Table> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(parse_error)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Parse("Workbook contains no worksheets".to_string()))?
        .map_err(parse_error)?;

    let mut sheet_rows = range.rows();
    let header: Vec<String> = match sheet_rows.next() {
        Some(cells) if !cells.is_empty() => cells.iter().map(|cell| cell.to_string()).collect(),
        _ => return Err(AppError::Parse("No columns to parse from file".to_string())),
    };

    let mut tallies = vec![TypeTally::default(); header.len()];
    let mut head: Vec<Vec<CellValue>> = Vec::with_capacity(PREVIEW_ROWS);
    let mut total_rows = 0;

    for cells in sheet_rows {
        let row: Vec<CellValue> = cells.iter().map(excel_cell).collect();
        for (tally, cell) in tallies.iter_mut().zip(&row) {
            if let Some(kind) = cell.kind() {
                tally.observe(kind);
            }
        }
        if head.len() < PREVIEW_ROWS {
            head.push(row);
        }
        total_rows += 1;
    }

    let column_types: Vec<ColumnType> = tallies.iter().map(TypeTally::column_type).collect();

    // Integers sharing a column with floats are widened.
    for row in &mut head {
        for (cell, ty) in row.iter_mut().zip(&column_types) {
            if let (CellValue::Int(i), ColumnType::Float) = (&*cell, ty) {
                *cell = CellValue::Float(*i as f64);
            }
        }
    }

    Ok(Table {
        columns: normalize_headers(header),
        column_types,
        total_rows,
        head,
    })
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Missing,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => float_cell(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => match missing_or_text(s) {
            Some(text) => CellValue::Text(text),
            None => CellValue::Missing,
        },
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) => {
            parse_datetime(s).map_or_else(|| CellValue::Text(s.clone()), CellValue::DateTime)
        }
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn float_cell(f: f64) -> CellValue {
    // Largest magnitude below which every integral f64 is exact.
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;

    if f.is_finite() && f.fract() == 0.0 && f.abs() < EXACT_LIMIT {
        CellValue::Int(f as i64)
    } else if f.is_finite() {
        CellValue::Float(f)
    } else {
        CellValue::Missing
    }
}

fn is_missing(field: &str) -> bool {
    MISSING_MARKERS.contains(&field)
}

fn missing_or_text(field: &str) -> Option<String> {
    if is_missing(field) {
        None
    } else {
        Some(field.to_string())
    }
}

/// Most specific type a single text cell parses as.
fn classify_text(text: &str) -> ColumnType {
    let trimmed = text.trim();
    if trimmed.parse::<i64>().is_ok() {
        ColumnType::Integer
    } else if parse_finite_float(trimmed).is_some() {
        ColumnType::Float
    } else if parse_bool(trimmed).is_some() {
        ColumnType::Boolean
    } else if parse_datetime(trimmed).is_some() {
        ColumnType::DateTime
    } else {
        ColumnType::Text
    }
}

fn coerce_text(text: String, ty: ColumnType) -> CellValue {
    let trimmed = text.trim();
    let coerced = match ty {
        ColumnType::Integer => trimmed.parse().ok().map(CellValue::Int),
        ColumnType::Float => parse_finite_float(trimmed).map(CellValue::Float),
        ColumnType::Boolean => parse_bool(trimmed).map(CellValue::Bool),
        ColumnType::DateTime => parse_datetime(trimmed).map(CellValue::DateTime),
        ColumnType::Text => None,
    };
    coerced.unwrap_or(CellValue::Text(text))
}

fn parse_finite_float(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(text: &str) -> Option<bool> {
    if TRUE_LITERALS.contains(&text) {
        Some(true)
    } else if FALSE_LITERALS.contains(&text) {
        Some(false)
    } else {
        None
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Blank headers become `Unnamed: {index}`; repeats get `.1`, `.2`, ...
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    raw.into_iter()
        .enumerate()
        .map(|(index, name)| {
            let mut name = if name.trim().is_empty() {
                format!("Unnamed: {index}")
            } else {
                name
            };

            let mut count = counts.get(&name).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{name}.{count}");
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), count + 1);
            name
        })
        .collect()
}

fn parse_error(err: impl std::fmt::Display) -> AppError {
    AppError::Parse(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn csv(text: &str) -> Table {
        from_csv(text.as_bytes()).expect("csv should parse")
    }

    #[test]
    fn sales_example() {
        let table = csv("region,amount\neast,100\nwest,\n");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.columns, ["region", "amount"]);

        let preview = table.preview(PREVIEW_ROWS);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0]["amount"], json!(100));
        assert_eq!(preview[1]["amount"], json!(""));
        assert_eq!(table.data_types()["amount"], "integer");
        assert_eq!(table.data_types()["region"], "text");
    }

    #[test]
    fn missing_markers_become_empty_strings() {
        let table = csv("a,b,c\nNA,null,x\nN/A,NaN,\n");
        for row in table.preview(PREVIEW_ROWS) {
            for (column, value) in &row {
                if column != "c" || value != "x" {
                    assert_eq!(value, &json!(""), "column {column}");
                }
            }
        }
        assert_eq!(table.data_types()["a"], "text");
    }

    #[test]
    fn type_precedence() {
        let table = csv(
            "ints,floats,flags,dates,mixed\n\
             1,1.5,true,2024-01-02,1\n\
             2,2,False,2024-01-03 10:30:00,abc\n",
        );
        let types = table.data_types();
        assert_eq!(types["ints"], "integer");
        assert_eq!(types["floats"], "float");
        assert_eq!(types["flags"], "boolean");
        assert_eq!(types["dates"], "datetime");
        assert_eq!(types["mixed"], "text");

        let preview = table.preview(PREVIEW_ROWS);
        assert_eq!(preview[1]["floats"], json!(2.0));
        assert_eq!(preview[0]["flags"], json!(true));
        assert_eq!(preview[0]["dates"], json!("2024-01-02T00:00:00"));
        assert_eq!(preview[1]["dates"], json!("2024-01-03T10:30:00"));
        assert_eq!(preview[0]["mixed"], json!("1"));
    }

    #[test]
    fn non_finite_numbers_stay_text() {
        let table = csv("x\ninf\n1\n");
        assert_eq!(table.data_types()["x"], "text");
    }

    #[test]
    fn preview_is_capped() {
        let mut text = String::from("n\n");
        for i in 0..25 {
            text.push_str(&format!("{i}\n"));
        }
        let table = csv(&text);
        assert_eq!(table.row_count(), 25);
        assert_eq!(table.preview(PREVIEW_ROWS).len(), PREVIEW_ROWS);
        assert_eq!(table.preview(PREVIEW_ROWS)[9]["n"], json!(9));
    }

    #[test]
    fn only_the_head_is_kept_but_every_row_is_typed() {
        let mut text = String::from("n,label\n");
        for i in 0..5_000 {
            text.push_str(&format!("{i},row {i}\n"));
        }
        text.push_str("1.5,last\n");
        let table = csv(&text);

        assert_eq!(table.row_count(), 5_001);
        assert_eq!(table.head.len(), PREVIEW_ROWS);
        assert_eq!(table.data_types()["n"], "float");
        assert_eq!(table.head[3][0], CellValue::Float(3.0));
        assert_eq!(table.head[3][1], CellValue::Text("row 3".into()));
    }

    #[test]
    fn long_row_past_the_head_is_still_rejected() {
        let mut text = String::from("a,b\n");
        for i in 0..50 {
            text.push_str(&format!("{i},{i}\n"));
        }
        text.push_str("1,2,3\n");
        let err = from_csv(text.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Parse(msg) if msg.contains("line 52")));
    }

    #[test]
    fn slash_dates_are_month_first_and_dotted_dates_day_first() {
        let table = csv("us,eu\n01/02/2024,01.02.2024\n");
        assert_eq!(table.data_types()["us"], "datetime");
        assert_eq!(table.data_types()["eu"], "datetime");

        let preview = table.preview(PREVIEW_ROWS);
        assert_eq!(preview[0]["us"], json!("2024-01-02T00:00:00"));
        assert_eq!(preview[0]["eu"], json!("2024-02-01T00:00:00"));

        let day_first = csv("d\n25/12/2024\n");
        assert_eq!(day_first.data_types()["d"], "text");
        assert_eq!(day_first.preview(PREVIEW_ROWS)[0]["d"], json!("25/12/2024"));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let table = csv("a,b\n");
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
        assert!(table.preview(PREVIEW_ROWS).is_empty());
        assert_eq!(table.data_types()["a"], "text");
    }

    #[test]
    fn headers_are_normalized() {
        let table = csv("a,,a,a.1,a\n1,2,3,4,5\n");
        assert_eq!(table.columns, ["a", "Unnamed: 1", "a.1", "a.1.1", "a.2"]);
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_rejected() {
        let table = csv("a,b,c\n1\n");
        assert_eq!(table.head[0], [CellValue::Int(1), CellValue::Missing, CellValue::Missing]);

        let err = from_csv(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, AppError::Parse(msg) if msg.contains("Expected 2 fields")));
    }

    #[test]
    fn bom_is_ignored() {
        let table = from_csv(b"\xEF\xBB\xBFname\nx\n").unwrap();
        assert_eq!(table.columns, ["name"]);
    }

    #[test]
    fn empty_and_invalid_input_fail() {
        assert!(matches!(from_csv(b""), Err(AppError::Parse(_))));
        assert!(matches!(from_csv(b"a,b\n\xff\xfe,1\n"), Err(AppError::Parse(_))));
        assert!(matches!(from_excel(b"definitely not a workbook"), Err(AppError::Parse(_))));
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let table = csv("name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\n");
        assert_eq!(table.head[0][0], CellValue::Text("Smith, J".into()));
        assert_eq!(table.head[0][1], CellValue::Text("said \"hi\"".into()));
    }

    #[test]
    fn xlsx_workbook() {
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "region").unwrap();
        sheet.write_string(0, 1, "amount").unwrap();
        sheet.write_string(0, 2, "ratio").unwrap();
        sheet.write_string(0, 3, "ok").unwrap();
        sheet.write_string(1, 0, "east").unwrap();
        sheet.write_number(1, 1, 100.0).unwrap();
        sheet.write_number(1, 2, 0.5).unwrap();
        sheet.write_boolean(1, 3, true).unwrap();
        sheet.write_string(2, 0, "west").unwrap();
        sheet.write_number(2, 2, 2.0).unwrap();
        sheet.write_boolean(2, 3, false).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = load_table(&bytes, FileKind::Spreadsheet).unwrap();
        assert_eq!(table.columns, ["region", "amount", "ratio", "ok"]);
        assert_eq!(table.row_count(), 2);

        let types = table.data_types();
        assert_eq!(types["amount"], "integer");
        assert_eq!(types["ratio"], "float");
        assert_eq!(types["ok"], "boolean");

        let preview = table.preview(PREVIEW_ROWS);
        assert_eq!(preview[0]["amount"], json!(100));
        assert_eq!(preview[1]["amount"], json!(""));
        assert_eq!(preview[1]["ratio"], json!(2.0));
        assert_eq!(preview[1]["ok"], json!(false));
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(FileKind::from_extension("CSV"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_extension("Xlsx"), Some(FileKind::Spreadsheet));
        assert_eq!(FileKind::from_extension("xls"), Some(FileKind::Spreadsheet));
        assert_eq!(FileKind::from_extension("txt"), None);
    }
}
