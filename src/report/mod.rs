//! Report assembly: the same filtered table, filter summary, and chart list
//! rendered either as a paginated PDF or a self-contained HTML document.

pub mod html;
pub mod pdf;

use color_eyre::Result;
use polars::prelude::*;

/// First rows of the filtered table with every value stringified, as shown
/// in both report formats.
#[derive(Clone, Debug)]
pub struct TablePreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TablePreview {
    /// Takes the first `limit` rows. Nulls render as empty cells.
    pub fn from_dataframe(df: &DataFrame, limit: usize) -> Result<Self> {
        let head = df.head(Some(limit));
        let headers: Vec<String> = head
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut rows = Vec::with_capacity(head.height());
        for i in 0..head.height() {
            let mut row = Vec::with_capacity(headers.len());
            for column in head.get_columns() {
                let value = column.get(i)?;
                row.push(match value {
                    AnyValue::Null => String::new(),
                    other => other.str_value().to_string(),
                });
            }
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_stringifies_first_rows() {
        let df = df!(
            "age" => &[Some(29.5), None, Some(9.0)],
            "gender" => &["Kobieta", "Mężczyzna", "Kobieta"]
        )
        .unwrap();
        let preview = TablePreview::from_dataframe(&df, 2).unwrap();
        assert_eq!(preview.headers, vec!["age", "gender"]);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.rows[0][0], "29.5");
        assert_eq!(preview.rows[1][0], "");
        assert_eq!(preview.rows[0][1], "Kobieta");
    }

    #[test]
    fn preview_shorter_than_limit() {
        let df = df!("x" => &[1i64]).unwrap();
        let preview = TablePreview::from_dataframe(&df, 10).unwrap();
        assert_eq!(preview.rows.len(), 1);
    }
}
