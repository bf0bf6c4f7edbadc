//! Flat-file adapter: CSV vitals table and uploaded tables.
//!
//! The vitals table is the store of record. Uploaded tables are external
//! input: they are decoded with a strict-then-permissive encoding fallback,
//! their delimiter is sniffed from the header line, and required columns are
//! matched by exact name.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

use crate::domain::vitals::{parse_timestamp, sort_records};
use crate::domain::{SortOrder, VitalField, VitalReading, VitalRecord};
use crate::ports::VitalsStore;
use crate::{Result, VitalcastError};

const PATIENT_ID: &str = "patient_id";
const TIMESTAMP: &str = "timestamp";

/// Header written for new tables.
pub const TABLE_HEADER: [&str; 7] = [
    PATIENT_ID,
    TIMESTAMP,
    VitalField::HeartRate.name(),
    VitalField::BpSystolic.name(),
    VitalField::BpDiastolic.name(),
    VitalField::OxygenSaturation.name(),
    VitalField::Temperature.name(),
];

/// Column positions of the vitals table, resolved from its header.
struct TableColumns {
    patient_id: usize,
    timestamp: usize,
    vitals: [usize; 5],
}

impl TableColumns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == name)
        };

        let mut missing = Vec::new();
        let patient_id = find(PATIENT_ID);
        let timestamp = find(TIMESTAMP);
        if patient_id.is_none() {
            missing.push(PATIENT_ID.to_string());
        }
        if timestamp.is_none() {
            missing.push(TIMESTAMP.to_string());
        }

        let mut vitals = [0usize; 5];
        for field in VitalField::ALL {
            match find(field.name()) {
                Some(idx) => vitals[field.index()] = idx,
                None => missing.push(field.name().to_string()),
            }
        }

        match (patient_id, timestamp) {
            (Some(patient_id), Some(timestamp)) if missing.is_empty() => Ok(Self {
                patient_id,
                timestamp,
                vitals,
            }),
            _ => Err(VitalcastError::MissingFeature { missing }),
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer columns accept `72` or `72.0`; a fractional value is rejected
/// rather than rounded.
fn parse_whole(raw: &str) -> Option<i32> {
    let value = parse_number(raw)?;
    if value.fract() != 0.0 || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return None;
    }
    Some(value as i32)
}

fn parse_row(row: &StringRecord, cols: &TableColumns) -> std::result::Result<VitalRecord, String> {
    let cell = |idx: usize| row.get(idx).unwrap_or("");

    let patient_id = cell(cols.patient_id)
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid patient_id '{}'", cell(cols.patient_id)))?;
    let timestamp = parse_timestamp(cell(cols.timestamp))
        .ok_or_else(|| format!("unparseable timestamp '{}'", cell(cols.timestamp)))?;

    let whole = |field: VitalField| {
        let raw = cell(cols.vitals[field.index()]);
        parse_whole(raw).ok_or_else(|| format!("invalid {} '{}'", field.name(), raw))
    };
    let number = |field: VitalField| {
        let raw = cell(cols.vitals[field.index()]);
        parse_number(raw).ok_or_else(|| format!("invalid {} '{}'", field.name(), raw))
    };

    Ok(VitalRecord {
        patient_id,
        timestamp,
        heart_rate: whole(VitalField::HeartRate)?,
        bp_systolic: whole(VitalField::BpSystolic)?,
        bp_diastolic: whole(VitalField::BpDiastolic)?,
        oxygen_saturation: number(VitalField::OxygenSaturation)?,
        temperature: number(VitalField::Temperature)?,
    })
}

/// CSV-backed vitals store.
pub struct CsvVitalsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvVitalsStore {
    /// Create a store over the given table path. The file need not exist yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn needs_header(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true)
    }
}

impl VitalsStore for CsvVitalsStore {
    fn load(&self, order: SortOrder) -> Result<Vec<VitalRecord>> {
        if !self.path.exists() {
            return Err(VitalcastError::MissingData {
                path: self.path.clone(),
            });
        }

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_path(&self.path)?;
        let cols = TableColumns::resolve(reader.headers()?)?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (i, row) in reader.byte_records().enumerate() {
            // +2: header line plus 1-based numbering
            let line = i + 2;
            let parsed = StringRecord::from_byte_record(row?)
                .map_err(|e| format!("invalid UTF-8 ({e})"))
                .and_then(|row| parse_row(&row, &cols));
            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => {
                    skipped += 1;
                    tracing::warn!("Skipping row {} of {:?}: {}", line, self.path, reason);
                }
            }
        }

        sort_records(&mut records, order);
        tracing::debug!(
            "Loaded {} records from {:?} ({} skipped)",
            records.len(),
            self.path,
            skipped
        );
        Ok(records)
    }

    fn append(&self, record: &VitalRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| VitalcastError::Validation("Vitals store lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let write_header = self.needs_header();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if write_header {
            writer.write_record(TABLE_HEADER)?;
        }
        writer.write_record([
            record.patient_id.to_string(),
            record.timestamp_string(),
            record.heart_rate.to_string(),
            record.bp_systolic.to_string(),
            record.bp_diastolic.to_string(),
            record.oxygen_saturation.to_string(),
            record.temperature.to_string(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

/// A decoded, delimiter-sniffed table from an upload.
#[derive(Debug, Clone)]
pub struct UploadTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    encoding: &'static str,
}

impl UploadTable {
    /// Read and decode an uploaded file.
    ///
    /// # Errors
    /// Returns `MissingData` if the file does not exist, or a CSV error if it is malformed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VitalcastError::MissingData {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Decode raw upload bytes: UTF-8 first, then Windows-1252.
    ///
    /// # Errors
    /// Returns a CSV error if the text is not a well-formed table.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (text, encoding) = match std::str::from_utf8(bytes) {
            Ok(s) => (std::borrow::Cow::Borrowed(s), "utf-8"),
            Err(_) => {
                let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
                tracing::info!("Upload is not valid UTF-8; decoded as windows-1252");
                (decoded, "windows-1252")
            }
        };
        let text = text.trim_start_matches('\u{feff}');

        let delimiter = sniff_delimiter(text);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for row in reader.records() {
            let row = row?;
            if row.iter().all(str::is_empty) {
                continue;
            }
            rows.push(row.iter().map(str::to_string).collect());
        }

        Ok(Self {
            columns,
            rows,
            encoding,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Name of the encoding the upload was decoded with.
    #[must_use]
    pub fn encoding(&self) -> &'static str {
        self.encoding
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Required feature columns absent from the header, in model order.
    #[must_use]
    pub fn missing_columns(&self) -> Vec<String> {
        VitalField::ALL
            .into_iter()
            .filter(|f| self.column(f.name()).is_none())
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Convert every row to a reading. Empty cells become `None`, as do
    /// identity cells (`patient_id`, `timestamp`) that do not parse.
    ///
    /// # Errors
    /// Returns `Validation` naming the row and column of any unparseable cell.
    pub fn readings(&self) -> Result<Vec<VitalReading>> {
        let patient_col = self.column(PATIENT_ID);
        let timestamp_col = self.column(TIMESTAMP);
        let field_cols: Vec<(VitalField, Option<usize>)> = VitalField::ALL
            .into_iter()
            .map(|f| (f, self.column(f.name())))
            .collect();

        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| -> Result<VitalReading> {
                let cell = |idx: Option<usize>| {
                    idx.and_then(|c| row.get(c))
                        .map(String::as_str)
                        .filter(|s| !s.is_empty())
                };

                let patient_id = cell(patient_col).and_then(|raw| {
                    let parsed = raw.parse::<i64>().ok();
                    if parsed.is_none() {
                        tracing::warn!(
                            "Upload row {}: ignoring invalid patient_id '{}'",
                            i + 1,
                            raw
                        );
                    }
                    parsed
                });
                let timestamp = cell(timestamp_col).and_then(|raw| {
                    let parsed = parse_timestamp(raw);
                    if parsed.is_none() {
                        tracing::warn!(
                            "Upload row {}: ignoring unparseable timestamp '{}'",
                            i + 1,
                            raw
                        );
                    }
                    parsed
                });

                let mut reading = VitalReading {
                    patient_id,
                    timestamp,
                    ..VitalReading::default()
                };

                for (field, col) in &field_cols {
                    let value = match cell(*col) {
                        Some(raw) => Some(parse_number(raw).ok_or_else(|| {
                            VitalcastError::Validation(format!(
                                "row {}: invalid {} value '{}'",
                                i + 1,
                                field.name(),
                                raw
                            ))
                        })?),
                        None => None,
                    };
                    reading.set(*field, value);
                }
                Ok(reading)
            })
            .collect()
    }
}

fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    [b',', b';', b'\t']
        .into_iter()
        .map(|d| (d, header.bytes().filter(|b| *b == d).count()))
        .fold((b',', 0), |best, cur| if cur.1 > best.1 { cur } else { best })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TABLE: &str = "\
patient_id,timestamp,heart_rate,bp_systolic,bp_diastolic,oxygen_saturation,temperature
1,2025-07-10 10:00:00,70,120,80,98,36.5
2,2025-07-10 09:00:00,90,130,85,95,37.1
1,not-a-time,71,121,81,97,36.6
1,2025-07-10 11:00:00,72,122,81,97,36.7
";

    fn write_table(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("vitals.csv");
        std::fs::write(&path, contents).expect("write table");
        path
    }

    #[test]
    fn test_load_missing_file_is_missing_data() {
        let temp = tempdir().expect("tempdir");
        let store = CsvVitalsStore::new(temp.path().join("absent.csv"));
        let err = store.load(SortOrder::Ascending).expect_err("must fail");
        assert!(matches!(err, VitalcastError::MissingData { .. }));
    }

    #[test]
    fn test_load_drops_bad_timestamps_and_sorts() {
        let temp = tempdir().expect("tempdir");
        let store = CsvVitalsStore::new(write_table(temp.path(), TABLE));

        let asc = store.load(SortOrder::Ascending).expect("load");
        assert_eq!(asc.len(), 3);
        assert_eq!(asc[0].patient_id, 2);
        assert_eq!(asc[2].timestamp_string(), "2025-07-10 11:00:00");

        let desc = store.load(SortOrder::Descending).expect("load");
        assert_eq!(desc[0].heart_rate, 72);
    }

    #[test]
    fn test_patient_queries() {
        let temp = tempdir().expect("tempdir");
        let store = CsvVitalsStore::new(write_table(temp.path(), TABLE));

        assert_eq!(store.patient_ids().expect("ids"), vec![1, 2]);
        let latest = store.latest_for(1).expect("latest").expect("some");
        assert_eq!(latest.heart_rate, 72);
        assert_eq!(store.history_for(1).expect("history").len(), 2);
        assert!(store.latest_for(99).expect("latest").is_none());
    }

    #[test]
    fn test_missing_column_is_reported_by_name() {
        let temp = tempdir().expect("tempdir");
        let store = CsvVitalsStore::new(write_table(
            temp.path(),
            "patient_id,timestamp,heart_rate,bp_systolic,bp_diastolic,oxygen_saturation\n1,2025-07-10 10:00:00,70,120,80,98\n",
        ));
        match store.load(SortOrder::Ascending) {
            Err(VitalcastError::MissingFeature { missing }) => {
                assert_eq!(missing, vec!["temperature".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_append_creates_file_with_header() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("vitals.csv");
        let store = CsvVitalsStore::new(&path);

        let record = VitalRecord {
            patient_id: 3,
            timestamp: parse_timestamp("2025-07-10 10:00:00").expect("ts"),
            heart_rate: 88,
            bp_systolic: 131,
            bp_diastolic: 84,
            oxygen_saturation: 96.0,
            temperature: 37.2,
        };
        store.append(&record).expect("append");
        store.append(&record).expect("append");

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("patient_id,timestamp,"));
        assert_eq!(text.lines().count(), 3);

        let loaded = store.load(SortOrder::Ascending).expect("load");
        assert_eq!(loaded, vec![record.clone(), record]);
    }

    #[test]
    fn test_upload_latin1_fallback_and_semicolons() {
        // 0xE9 is 'é' in windows-1252 and invalid as standalone UTF-8.
        let mut bytes = b"patient_id;note;heart_rate;bp_systolic;bp_diastolic;oxygen_saturation;temperature\n".to_vec();
        bytes.extend_from_slice(b"5;caf\xe9;80;125;82;97;36.9\n");

        let table = UploadTable::from_bytes(&bytes).expect("decode");
        assert_eq!(table.encoding(), "windows-1252");
        assert!(table.missing_columns().is_empty());

        let readings = table.readings().expect("readings");
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].patient_id, Some(5));
        assert_eq!(readings[0].temperature, Some(36.9));
    }

    #[test]
    fn test_load_skips_row_with_invalid_utf8() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("vitals.csv");
        let mut bytes = TABLE_HEADER.join(",").into_bytes();
        bytes.extend_from_slice(b"\n1,2025-07-10 10:00:00,70,120,80,98,36.5\n");
        bytes.extend_from_slice(b"1,2025-07-10 10:\xff0:00,71,121,81,97,36.6\n");
        bytes.extend_from_slice(b"1,2025-07-10 11:00:00,72,122,81,97,36.7\n");
        std::fs::write(&path, bytes).expect("write table");

        let store = CsvVitalsStore::new(&path);
        let records = store.load(SortOrder::Ascending).expect("load");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].heart_rate, 70);
        assert_eq!(records[1].heart_rate, 72);
    }

    #[test]
    fn test_load_rejects_fractional_integer_vitals() {
        let temp = tempdir().expect("tempdir");
        let store = CsvVitalsStore::new(write_table(
            temp.path(),
            "\
patient_id,timestamp,heart_rate,bp_systolic,bp_diastolic,oxygen_saturation,temperature
1,2025-07-10 10:00:00,72.6,120,80,98,36.5
1,2025-07-10 11:00:00,73.0,120,80,98,36.5
",
        ));

        let records = store.load(SortOrder::Ascending).expect("load");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].heart_rate, 73);
        assert_eq!(records[0].timestamp_string(), "2025-07-10 11:00:00");
    }

    #[test]
    fn test_upload_ignores_bom() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(
            b"heart_rate,bp_systolic,bp_diastolic,oxygen_saturation,temperature\n70,120,80,98,36.5\n",
        );

        let table = UploadTable::from_bytes(&bytes).expect("decode");
        assert_eq!(table.encoding(), "utf-8");
        assert!(table.missing_columns().is_empty());
        let readings = table.readings().expect("readings");
        assert_eq!(readings[0].heart_rate, Some(70.0));
    }

    #[test]
    fn test_upload_sniffs_tab_delimiter() {
        let table = UploadTable::from_bytes(
            b"patient_id\theart_rate\tbp_systolic\tbp_diastolic\toxygen_saturation\ttemperature\n\
              7\t88\t131\t84\t96\t37.2\n",
        )
        .expect("decode");
        assert!(table.missing_columns().is_empty());

        let readings = table.readings().expect("readings");
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].patient_id, Some(7));
        assert_eq!(readings[0].bp_diastolic, Some(84.0));
        assert_eq!(readings[0].temperature, Some(37.2));
    }

    #[test]
    fn test_upload_unparseable_identity_cells_become_none() {
        let table = UploadTable::from_bytes(
            b"patient_id,timestamp,heart_rate,bp_systolic,bp_diastolic,oxygen_saturation,temperature\n\
              P-7,yesterday,70,120,80,98,36.5\n",
        )
        .expect("decode");

        let readings = table.readings().expect("readings");
        assert_eq!(readings[0].patient_id, None);
        assert_eq!(readings[0].timestamp, None);
        assert_eq!(readings[0].heart_rate, Some(70.0));
    }

    #[test]
    fn test_upload_reports_missing_columns() {
        let table = UploadTable::from_bytes(b"heart_rate,bp_systolic,bp_diastolic\n70,120,80\n")
            .expect("decode");
        assert_eq!(
            table.missing_columns(),
            vec!["oxygen_saturation".to_string(), "temperature".to_string()]
        );
    }

    #[test]
    fn test_upload_rejects_garbage_cells() {
        let table = UploadTable::from_bytes(
            b"heart_rate,bp_systolic,bp_diastolic,oxygen_saturation,temperature\n70,abc,80,98,36.5\n",
        )
        .expect("decode");
        let err = table.readings().expect_err("must fail");
        assert!(err.to_string().contains("bp_systolic"));
    }
}
