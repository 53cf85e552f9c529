//! Dataset loading and report persistence.
//!
//! CSV and JSON files load into a typed [`Dataset`]. Column kinds are
//! inferred in a first pass over the parsed cells (`Int` when every
//! non-empty cell parses as an integer, `Float` when every one parses as a
//! number, `Text` otherwise) and cells are converted in a second pass.
//! Empty CSV cells and JSON nulls become [`Value::Missing`].

use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use log::info;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::data::{AttrKind, Attribute, Dataset, Schema, Value};
use crate::error::{Error, Result};

/// Load a delimited text file.
pub fn read_csv<P: AsRef<Path>>(path: P, delimiter: char) -> Result<Dataset> {
    let file = File::open(path)?;
    parse_csv(file, delimiter)
}

/// Load a JSON file holding either an array of objects or one object.
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let file = File::open(path)?;
    let value: JsonValue = serde_json::from_reader(file)?;
    dataset_from_json(value)
}

/// Load a file, dispatching on its extension (`.csv` or `.json`).
pub fn read_table<P: AsRef<Path>>(path: P, delimiter: char) -> Result<Dataset> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let dataset = match extension.as_str() {
        "csv" => read_csv(path, delimiter)?,
        "json" => read_json(path)?,
        "" => return Err(Error::UnsupportedFormat(path.display().to_string())),
        other => return Err(Error::UnsupportedFormat(format!(".{other}"))),
    };
    info!(
        "loaded {} rows x {} columns from {}",
        dataset.n_rows(),
        dataset.schema().len(),
        path.display()
    );
    Ok(dataset)
}

/// Write any serializable value as pretty-printed JSON.
pub fn save_json<T: Serialize, P: AsRef<Path>>(data: &T, path: P) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, data)?;
    Ok(())
}

fn parse_csv<R: std::io::Read>(reader: R, delimiter: char) -> Result<Dataset> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .from_reader(reader);
    let names: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        cells.push(record.iter().map(str::to_string).collect());
    }

    let kinds: Vec<AttrKind> = (0..names.len())
        .map(|col| infer_column_kind(cells.iter().map(|row| row[col].as_str())))
        .collect();
    let schema = Schema::new(
        names
            .iter()
            .zip(&kinds)
            .map(|(name, &kind)| Attribute::new(name.as_str(), kind))
            .collect(),
    )?;
    let rows = cells
        .iter()
        .map(|row| {
            row.iter()
                .zip(&kinds)
                .map(|(cell, &kind)| parse_cell(cell, kind))
                .collect()
        })
        .collect();
    Dataset::new(schema, rows)
}

fn infer_column_kind<'a>(cells: impl Iterator<Item = &'a str>) -> AttrKind {
    let mut seen_any = false;
    let mut all_int = true;
    let mut all_float = true;
    for cell in cells.filter(|cell| !cell.is_empty()) {
        seen_any = true;
        if cell.parse::<i64>().is_err() {
            all_int = false;
        }
        if cell.parse::<f64>().is_err() {
            all_float = false;
            break;
        }
    }
    if seen_any && all_int {
        AttrKind::Int
    } else if seen_any && all_float {
        AttrKind::Float
    } else {
        AttrKind::Text
    }
}

fn parse_cell(cell: &str, kind: AttrKind) -> Value {
    if cell.is_empty() {
        return Value::Missing;
    }
    match kind {
        AttrKind::Int => cell
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(cell.to_string())),
        AttrKind::Float => cell
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::Text(cell.to_string())),
        AttrKind::Text => Value::Text(cell.to_string()),
    }
}

fn dataset_from_json(value: JsonValue) -> Result<Dataset> {
    let records: Vec<serde_json::Map<String, JsonValue>> = match value {
        JsonValue::Object(record) => vec![record],
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsonValue::Object(record) => Ok(record),
                other => Err(Error::UnsupportedFormat(format!(
                    "JSON array element is {}, expected an object",
                    json_type_name(&other)
                ))),
            })
            .collect::<Result<_>>()?,
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "JSON document is {}, expected an object or an array of objects",
                json_type_name(&other)
            )))
        }
    };

    // Column order is first appearance; keys of each object iterate sorted.
    let mut names: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !names.iter().any(|name| name == key) {
                names.push(key.clone());
            }
        }
    }

    let kinds: Vec<AttrKind> = names
        .iter()
        .map(|name| infer_json_kind(&records, name))
        .collect();
    let schema = Schema::new(
        names
            .iter()
            .zip(&kinds)
            .map(|(name, &kind)| Attribute::new(name.as_str(), kind))
            .collect(),
    )?;
    let rows = records
        .iter()
        .map(|record| {
            names
                .iter()
                .zip(&kinds)
                .map(|(name, &kind)| json_cell(record.get(name), kind))
                .collect()
        })
        .collect();
    Dataset::new(schema, rows)
}

fn infer_json_kind(records: &[serde_json::Map<String, JsonValue>], name: &str) -> AttrKind {
    let mut seen_any = false;
    let mut all_int = true;
    let mut all_float = true;
    for record in records {
        match record.get(name) {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Number(number)) => {
                seen_any = true;
                if !number.is_i64() {
                    all_int = false;
                }
            }
            Some(_) => {
                seen_any = true;
                all_int = false;
                all_float = false;
            }
        }
    }
    if seen_any && all_int {
        AttrKind::Int
    } else if seen_any && all_float {
        AttrKind::Float
    } else {
        AttrKind::Text
    }
}

fn json_cell(value: Option<&JsonValue>, kind: AttrKind) -> Value {
    match value {
        None | Some(JsonValue::Null) => Value::Missing,
        Some(JsonValue::Number(number)) => match kind {
            AttrKind::Int => number
                .as_i64()
                .map(Value::Int)
                .unwrap_or_else(|| Value::Text(number.to_string())),
            AttrKind::Float => number
                .as_f64()
                .map(Value::Float)
                .unwrap_or_else(|| Value::Text(number.to_string())),
            AttrKind::Text => Value::Text(number.to_string()),
        },
        Some(JsonValue::String(text)) => Value::Text(text.clone()),
        Some(JsonValue::Bool(flag)) => Value::Text(flag.to_string()),
        // Nested arrays and objects are kept as their JSON text.
        Some(other) => Value::Text(other.to_string()),
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_csv_infers_kinds() {
        let text = "name,age,score\nalice,34,1.5\nbob,40,2\n";
        let data = parse_csv(text.as_bytes(), ',').unwrap();
        let kinds: Vec<AttrKind> = data.schema().attrs().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AttrKind::Text, AttrKind::Int, AttrKind::Float]);
        assert_eq!(data.value(0, 0), &Value::Text("alice".to_string()));
        assert_eq!(data.value(1, 1), &Value::Int(40));
        assert_eq!(data.value(1, 2), &Value::Float(2.0));
    }

    #[test]
    fn test_parse_csv_empty_cells_become_missing() {
        let text = "age,city\n34,Boston\n,Denver\n40,\n";
        let data = parse_csv(text.as_bytes(), ',').unwrap();
        assert_eq!(data.value(1, 0), &Value::Missing);
        assert_eq!(data.value(2, 1), &Value::Missing);
        // Kind inference ignores the empty cells.
        assert_eq!(data.schema().attrs()[0].kind, AttrKind::Int);
    }

    #[test]
    fn test_parse_csv_mixed_column_falls_back_to_text() {
        let text = "code\n12\nabc\n";
        let data = parse_csv(text.as_bytes(), ',').unwrap();
        assert_eq!(data.schema().attrs()[0].kind, AttrKind::Text);
        assert_eq!(data.value(0, 0), &Value::Text("12".to_string()));
    }

    #[test]
    fn test_parse_csv_custom_delimiter() {
        let text = "a;b\n1;2\n";
        let data = parse_csv(text.as_bytes(), ';').unwrap();
        assert_eq!(data.n_rows(), 1);
        assert_eq!(data.value(0, 1), &Value::Int(2));
    }

    #[test]
    fn test_parse_csv_duplicate_header_is_rejected() {
        let text = "age,age\n1,2\n";
        let result = parse_csv(text.as_bytes(), ',');
        assert!(matches!(
            result,
            Err(Error::Configuration(ConfigurationError::DuplicateAttribute(_)))
        ));
    }

    #[test]
    fn test_parse_csv_ragged_row_is_rejected() {
        let text = "a,b\n1,2\n3\n";
        assert!(matches!(parse_csv(text.as_bytes(), ','), Err(Error::Csv(_))));
    }

    #[test]
    fn test_parse_csv_all_missing_column_is_text() {
        let text = "a,b\n1,\n2,\n";
        let data = parse_csv(text.as_bytes(), ',').unwrap();
        assert_eq!(data.schema().attrs()[1].kind, AttrKind::Text);
        assert_eq!(data.value(0, 1), &Value::Missing);
    }

    #[test]
    fn test_json_array_of_objects() {
        let data = dataset_from_json(json!([
            {"age": 30, "city": "Boston"},
            {"age": 41, "city": "Denver"},
        ]))
        .unwrap();
        assert_eq!(data.n_rows(), 2);
        let names: Vec<&str> = data
            .schema()
            .attrs()
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["age", "city"]);
        assert_eq!(data.value(1, 0), &Value::Int(41));
    }

    #[test]
    fn test_json_single_object_is_one_row() {
        let data = dataset_from_json(json!({"age": 30})).unwrap();
        assert_eq!(data.n_rows(), 1);
        assert_eq!(data.value(0, 0), &Value::Int(30));
    }

    #[test]
    fn test_json_null_and_absent_keys_are_missing() {
        let data = dataset_from_json(json!([
            {"age": 30, "city": null},
            {"age": 41},
        ]))
        .unwrap();
        assert_eq!(data.value(0, 1), &Value::Missing);
        assert_eq!(data.value(1, 1), &Value::Missing);
    }

    #[test]
    fn test_json_mixed_numbers_widen_to_float() {
        let data = dataset_from_json(json!([{"x": 1}, {"x": 2.5}])).unwrap();
        assert_eq!(data.schema().attrs()[0].kind, AttrKind::Float);
        assert_eq!(data.value(0, 0), &Value::Float(1.0));
    }

    #[test]
    fn test_json_scalar_document_is_rejected() {
        assert!(matches!(
            dataset_from_json(json!(42)),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            dataset_from_json(json!(["plain", "strings"])),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_read_table_dispatches_on_extension() {
        let mut csv_file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(csv_file, "age\n30").unwrap();
        csv_file.flush().unwrap();
        let data = read_table(csv_file.path(), ',').unwrap();
        assert_eq!(data.n_rows(), 1);

        let mut json_file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .unwrap();
        write!(json_file, "[{{\"age\": 30}}]").unwrap();
        json_file.flush().unwrap();
        let data = read_table(json_file.path(), ',').unwrap();
        assert_eq!(data.n_rows(), 1);

        let other = NamedTempFile::new().unwrap();
        assert!(matches!(
            read_table(other.path(), ','),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_save_json_round_trip() {
        #[derive(Serialize)]
        struct Payload {
            total: usize,
        }
        let file = NamedTempFile::new().unwrap();
        save_json(&Payload { total: 7 }, file.path()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let value: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total"], 7);
    }
}
