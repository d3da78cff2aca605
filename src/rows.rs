//! Observation row parsing.
//!
//! Locates the timestamp column from a dataset header, tolerating quoting,
//! case, and spacing drift, and parses the portal's fixed
//! `DD/MM/YYYY HH:MM:SS` timestamp format.
//!
//! Parse failures are handled asymmetrically by the callers: the coverage
//! scan skips malformed stored rows (they cannot be trusted to order later
//! merges), while the merge path appends malformed fetched rows anyway
//! rather than lose an observation.

use crate::constants::{FIELD_DELIMITER, TIMESTAMP_COLUMN_NAMES, TIMESTAMP_FORMAT};
use crate::error::{RemError, Result};
use chrono::NaiveDateTime;

/// Locate the timestamp column in a header line.
///
/// Columns are compared after stripping surrounding quotes and whitespace,
/// folding case, and removing internal spaces, so `"Fecha/Hora"`,
/// `FECHAHORA`, and `fecha _hora` all match. Falls back to column 0 when
/// nothing matches: rows must never be lost just because the header drifted.
pub fn timestamp_column(header: &str) -> usize {
    for (index, column) in header.trim_end_matches('\r').split(FIELD_DELIMITER).enumerate() {
        let canonical = column
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim()
            .to_lowercase()
            .replace(' ', "");
        if TIMESTAMP_COLUMN_NAMES.contains(&canonical.as_str()) {
            return index;
        }
    }
    0
}

/// Parse one timestamp field, tolerant of surrounding quotes and spaces
pub fn parse_timestamp(field: &str) -> Result<NaiveDateTime> {
    let cleaned = field.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    NaiveDateTime::parse_from_str(cleaned, TIMESTAMP_FORMAT).map_err(|e| RemError::MalformedRow {
        reason: format!("invalid timestamp '{cleaned}': {e}"),
    })
}

/// Extract and parse the timestamp of one data row at the given column
pub fn row_timestamp(line: &str, column: usize) -> Result<NaiveDateTime> {
    let field = line
        .trim_end_matches('\r')
        .split(FIELD_DELIMITER)
        .nth(column)
        .ok_or_else(|| RemError::MalformedRow {
            reason: format!("row has no column {column}: '{}'", line.trim_end()),
        })?;
    parse_timestamp(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_column_canonical_spellings() {
        assert_eq!(timestamp_column("Fecha/Hora;Temp;Humedad"), 0);
        assert_eq!(timestamp_column("Temp;FechaHora;Humedad"), 1);
        assert_eq!(timestamp_column("Temp;Humedad;Fecha_Hora"), 2);
    }

    #[test]
    fn test_timestamp_column_tolerates_quotes_case_and_spacing() {
        assert_eq!(timestamp_column("\"Fecha/Hora\";\"Temp\""), 0);
        assert_eq!(timestamp_column("Temp;' FECHA/HORA '"), 1);
        assert_eq!(timestamp_column("Temp;Fecha Hora\r"), 1);
    }

    #[test]
    fn test_timestamp_column_defaults_to_first() {
        assert_eq!(timestamp_column("Timestamp;Temp"), 0);
        assert_eq!(timestamp_column(""), 0);
    }

    #[test]
    fn test_parse_timestamp_fixed_format() {
        let ts = parse_timestamp("01/02/2020 13:45:00").unwrap();
        assert_eq!(ts.to_string(), "2020-02-01 13:45:00");
    }

    #[test]
    fn test_parse_timestamp_tolerates_quotes() {
        assert!(parse_timestamp("\"15/06/2021 00:00:00\"").is_ok());
        assert!(parse_timestamp("  01/01/2020 10:00:00  ").is_ok());
    }

    #[test]
    fn test_parse_timestamp_rejects_other_formats() {
        assert!(matches!(
            parse_timestamp("2020-01-01 10:00:00"),
            Err(RemError::MalformedRow { .. })
        ));
        assert!(parse_timestamp("sin datos").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_row_timestamp_extracts_column() {
        let line = "18,2;01/03/2022 06:00:00;45";
        let ts = row_timestamp(line, 1).unwrap();
        assert_eq!(ts.to_string(), "2022-03-01 06:00:00");
    }

    #[test]
    fn test_row_timestamp_missing_column_is_malformed() {
        assert!(matches!(
            row_timestamp("only;two", 5),
            Err(RemError::MalformedRow { .. })
        ));
    }
}
