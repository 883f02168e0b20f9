//! Record loaders: CSV (encoding and delimiter auto-detection) and JSON.
//!
//! Loaders produce [`RawRecord`]s only. Required-field and uniqueness checks
//! happen later, in [`crate::models::RecordSet::from_raw`].

use serde_json::Value;
use std::path::Path;

use crate::error::{LoadError, LoadResult, SchemaError};
use crate::logs::log_warning;
use crate::models::RawRecord;
use crate::validation::validate_client_record;

/// Result of loading a table, with detection metadata
#[derive(Debug, Clone)]
pub struct LoadedTable {
    /// Raw records in file order
    pub records: Vec<RawRecord>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter (`None` for JSON input)
    pub delimiter: Option<char>,
    /// Column headers (field names for JSON input)
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" | "latin-9" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> LoadResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| LoadError::EncodingError(e.to_string())),
        // WHATWG maps latin1 labels to windows-1252, a superset of ISO-8859-1
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned())
        }
        "iso-8859-15" | "latin-9" => Ok(encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()),
        other => {
            log_warning(format!("Unknown encoding '{}', decoding as lossy UTF-8", other));
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Detect the delimiter by counting occurrences in the header line.
///
/// Ties go to the earlier candidate; a header with no candidate yields `,`.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Header names may be the snake_case export names or the legacy
/// spreadsheet titles. Unknown columns are ignored; empty cells load as
/// missing values.
pub fn load_csv_str(content: &str, delimiter: char) -> LoadResult<LoadedTable> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let delimiter_byte = u8::try_from(delimiter)
        .map_err(|_| LoadError::EncodingError(format!("delimiter '{}' is not ASCII", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    for row in reader.deserialize::<RawRecord>() {
        records.push(row?);
    }

    Ok(LoadedTable {
        records,
        encoding: "utf-8".to_string(),
        delimiter: Some(delimiter),
        headers,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn load_csv_bytes(bytes: &[u8]) -> LoadResult<LoadedTable> {
    if bytes.is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    let mut table = load_csv_str(&content, delimiter)?;
    table.encoding = encoding;
    Ok(table)
}

/// Load a CSV file with auto-detection of encoding and delimiter.
pub fn load_csv_file<P: AsRef<Path>>(path: P) -> LoadResult<LoadedTable> {
    let bytes = std::fs::read(path.as_ref())?;
    load_csv_bytes(&bytes)
}

/// Parse a JSON array of record objects.
///
/// Each element is checked against the embedded client record schema;
/// a mismatch is reported as a [`SchemaError`] carrying the element index.
pub fn load_json_str(content: &str) -> LoadResult<LoadedTable> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let rows: Vec<Value> = serde_json::from_str(content)?;
    let mut headers: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());

    for (row, value) in rows.into_iter().enumerate() {
        validate_client_record(&value).map_err(|errors| SchemaError::InvalidField {
            row,
            field: "record".to_string(),
            message: errors.join("; "),
        })?;

        if let Some(obj) = value.as_object() {
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        // Legacy alias keys are not covered by the schema
        let record = serde_json::from_value::<RawRecord>(value).map_err(|e| {
            SchemaError::InvalidField {
                row,
                field: "record".to_string(),
                message: e.to_string(),
            }
        })?;
        records.push(record);
    }

    Ok(LoadedTable {
        records,
        encoding: "utf-8".to_string(),
        delimiter: None,
        headers,
    })
}

/// Load a JSON file containing an array of record objects.
pub fn load_json_file<P: AsRef<Path>>(path: P) -> LoadResult<LoadedTable> {
    let content = std::fs::read_to_string(path.as_ref())?;
    load_json_str(&content)
}

/// Load a file, choosing the format from its extension (`.json` or CSV).
pub fn load_file<P: AsRef<Path>>(path: P) -> LoadResult<LoadedTable> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        load_json_file(path)
    } else {
        load_csv_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAKE_CSV: &str = "client_id,segment,industry,country,financed_amount,co2_tons,energy_mwh,water_thousand_m3,water_stress,flood_risk,drought_risk,report_date
101,Medium Corporate,Transportation and Storage,Lithuania,405639,3184,4323,3691,0.76,0.47,0.65,03/2023
102,Small Corporate,Transportation and Storage,Estonia,19642,562,1922,1348,0.48,0.66,0.20,03/2023
";

    #[test]
    fn test_snake_case_headers() {
        let table = load_csv_str(SNAKE_CSV, ',').unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.headers.len(), 12);
        assert_eq!(table.records[0].client_id, Some(101));
        assert_eq!(table.records[1].country.as_deref(), Some("Estonia"));
        assert_eq!(table.records[1].drought_risk, Some(0.20));
    }

    #[test]
    fn test_legacy_headers() {
        let csv = "ClientID;Segment;Industry;Country;Financed Amount;CO2 (tons);Energy Consumption (MWh);Water Usage (thousand m3);Water Stress;Flood Risk;Drought Risk;Report_Date
105;Medium Corporate;Agriculture, Forestry and Fishing;Latvia;221043;998;4738;13471;0.38;0.56;0.59;03/2023";
        let table = load_csv_bytes(csv.as_bytes()).unwrap();

        assert_eq!(table.delimiter, Some(';'));
        let row = &table.records[0];
        assert_eq!(row.client_id, Some(105));
        assert_eq!(row.industry.as_deref(), Some("Agriculture, Forestry and Fishing"));
        assert_eq!(row.financed_amount, Some(221043.0));
        assert_eq!(row.water_thousand_m3, Some(13471.0));
        assert_eq!(row.report_date.as_deref(), Some("03/2023"));
    }

    #[test]
    fn test_empty_cell_loads_as_missing() {
        let csv = "client_id,country,co2_tons\n7,Latvia,\n";
        let table = load_csv_str(csv, ',').unwrap();

        assert_eq!(table.records[0].co2_tons, None);
        assert_eq!(table.records[0].segment, None);
    }

    #[test]
    fn test_unparseable_number_is_csv_error() {
        let csv = "client_id,co2_tons\n7,lots\n";
        let err = load_csv_str(csv, ',').unwrap_err();
        assert!(matches!(err, LoadError::CsvError(_)));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(load_csv_bytes(b""), Err(LoadError::EmptyFile)));
        assert!(matches!(load_json_str("  "), Err(LoadError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_currency_sign_is_not_euro() {
        assert_eq!(decode_content(&[0xA4], "iso-8859-1").unwrap(), "¤");
        assert_eq!(decode_content(&[0xA4], "iso-8859-15").unwrap(), "€");
    }

    #[test]
    fn test_json_records() {
        let json = r#"[
            {"client_id": 101, "country": "Lithuania", "financed_amount": 405639, "report_date": "03/2023"},
            {"ClientID": 102, "Country": "Estonia", "Financed Amount": 19642}
        ]"#;
        let table = load_json_str(json).unwrap();

        assert_eq!(table.delimiter, None);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1].client_id, Some(102));
        assert_eq!(table.records[1].financed_amount, Some(19642.0));
        assert!(table.headers.contains(&"report_date".to_string()));
    }

    #[test]
    fn test_json_schema_violation_names_row() {
        let json = r#"[
            {"client_id": 101},
            {"client_id": 102, "water_stress": "high"}
        ]"#;
        let err = load_json_str(json).unwrap_err();
        match err {
            LoadError::Schema(SchemaError::InvalidField { row, .. }) => assert_eq!(row, 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_json_legacy_key_type_error_names_row() {
        let json = r#"[{"client_id": 1}, {"client_id": 2, "Financed Amount": "lots"}]"#;
        let err = load_json_str(json).unwrap_err();
        match err {
            LoadError::Schema(SchemaError::InvalidField { row, field, message }) => {
                assert_eq!(row, 1);
                assert_eq!(field, "record");
                assert!(message.contains("lots"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("clients.csv");
        let json_path = dir.path().join("clients.JSON");
        std::fs::write(&csv_path, SNAKE_CSV).unwrap();
        std::fs::write(&json_path, r#"[{"client_id": 1}]"#).unwrap();

        assert_eq!(load_file(&csv_path).unwrap().records.len(), 2);
        assert_eq!(load_file(&json_path).unwrap().delimiter, None);
    }
}
