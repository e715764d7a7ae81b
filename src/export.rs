//! Re-serialization of the filtered table: CSV via polars, Excel via
//! rust_xlsxwriter (one sheet, stringified text cells, numeric cells kept
//! numeric).

use color_eyre::Result;
use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Writes the table as CSV with headers.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let mut df = df.clone();
    let file = std::fs::File::create(path)?;
    CsvWriter::new(file).finish(&mut df)?;
    Ok(())
}

/// Writes the table as a single-sheet Excel workbook.
pub fn write_excel(df: &DataFrame, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Dane")?;

    for (c, name) in df.get_column_names().iter().enumerate() {
        worksheet.write_string(0, c as u16, name.as_str())?;
    }
    for (c, column) in df.get_columns().iter().enumerate() {
        let series = column.as_materialized_series();
        for r in 0..df.height() {
            let row = (r + 1) as u32;
            match series.get(r)? {
                AnyValue::Null => {}
                AnyValue::Float64(v) => {
                    worksheet.write_number(row, c as u16, v)?;
                }
                AnyValue::Float32(v) => {
                    worksheet.write_number(row, c as u16, v as f64)?;
                }
                AnyValue::Int64(v) => {
                    worksheet.write_number(row, c as u16, v as f64)?;
                }
                AnyValue::Int32(v) => {
                    worksheet.write_number(row, c as u16, v as f64)?;
                }
                AnyValue::Boolean(v) => {
                    worksheet.write_boolean(row, c as u16, v)?;
                }
                other => {
                    worksheet.write_string(row, c as u16, other.str_value().as_ref())?;
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}
