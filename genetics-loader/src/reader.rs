//! CSV row reader
//!
//! Opens the lab export, checks the extension and yields one decoded
//! [`GeneticRow`] per line. Columns are positional; the mapping comes from the
//! validated [`ColumnSchema`]. The sequence is lazy and forward-only, and it
//! stops for good after the first error.

use crate::error::{IngestError, IngestResult};
use chrono::NaiveDate;
use csv::StringRecord;
use genetics_common::config::ColumnSchema;
use std::fs::File;
use std::path::Path;

/// Required input file extension
pub const CSV_EXTENSION: &str = "csv";

/// One marker result taken from its column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerResult {
    pub key: String,
    pub value: String,
}

/// One decoded CSV line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneticRow {
    /// 1-based line number in the input file
    pub line: u64,
    /// Tracking code printed on the sample tube
    pub container_id: String,
    /// Marker results in column-schema order
    pub markers: Vec<MarkerResult>,
    pub date: NaiveDate,
}

/// Lazy reader over the rows of one input file
///
/// Owns the file handle; it is released when the reader is dropped, whatever
/// the exit path of the run.
pub struct GeneticsCsvReader {
    records: csv::StringRecordsIntoIter<File>,
    schema: ColumnSchema,
    min_width: usize,
    finished: bool,
}

impl GeneticsCsvReader {
    /// Open `path` for reading
    ///
    /// Fails with `InvalidFormat` before touching the file if the extension is
    /// not `.csv`, and with `Io` if the file cannot be opened.
    pub fn open(path: &Path, schema: ColumnSchema, has_headers: bool) -> IngestResult<Self> {
        if path.extension().and_then(|ext| ext.to_str()) != Some(CSV_EXTENSION) {
            return Err(IngestError::InvalidFormat {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path)?;

        // Width is checked per row against the schema, not against the first row
        let reader = csv::ReaderBuilder::new()
            .has_headers(has_headers)
            .flexible(true)
            .from_reader(file);

        let min_width = schema.min_width();
        Ok(Self {
            records: reader.into_records(),
            schema,
            min_width,
            finished: false,
        })
    }
}

impl Iterator for GeneticsCsvReader {
    type Item = IngestResult<GeneticRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = match self.records.next()? {
            Ok(record) => decode_record(&record, &self.schema, self.min_width),
            Err(e) => Err(IngestError::Csv(e)),
        };

        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

/// Decode one raw record into a [`GeneticRow`]
pub fn decode_record(
    record: &StringRecord,
    schema: &ColumnSchema,
    min_width: usize,
) -> IngestResult<GeneticRow> {
    let line = record.position().map_or(0, |pos| pos.line());

    if record.len() < min_width {
        return Err(IngestError::MalformedRow {
            line,
            fields: record.len(),
            required: min_width,
        });
    }

    let raw_date = &record[schema.date];
    let date = parse_date(raw_date, &schema.date_format).ok_or_else(|| IngestError::InvalidDate {
        line,
        value: raw_date.to_string(),
        format: schema.date_format.clone(),
    })?;

    let markers = schema
        .markers
        .iter()
        .map(|marker| MarkerResult {
            key: marker.key.clone(),
            value: record[marker.column].to_string(),
        })
        .collect();

    Ok(GeneticRow {
        line,
        container_id: record[schema.container_id].to_string(),
        markers,
        date,
    })
}

/// Parse `raw` only if it is written exactly as `format` renders it
///
/// chrono accepts unpadded fields, short years and a leading sign or space,
/// so the parsed date must format back to the same text.
fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, format)
        .ok()
        .filter(|date| date.format(format).to_string() == raw)
}
