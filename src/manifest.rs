use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::domain::DEFAULT_ASSEMBLY;
use crate::error::KiraError;

/// One data row of the genome list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub line: u64,
    pub accession: String,
    pub assembly: String,
}

impl ManifestRow {
    fn from_record(line: u64, record: &StringRecord) -> Self {
        let accession = record.get(0).unwrap_or_default().trim().to_string();
        let assembly = record
            .get(1)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ASSEMBLY)
            .to_string();
        Self {
            line,
            accession,
            assembly,
        }
    }

    /// Rows without an accession are skipped, not counted as failures.
    pub fn is_blank(&self) -> bool {
        self.accession.is_empty()
    }
}

/// Tab-separated genome list. The first row is a header and is ignored;
/// rows may carry any number of columns.
pub struct ManifestReader<R: Read> {
    reader: csv::Reader<R>,
    done: bool,
}

impl ManifestReader<File> {
    pub fn open(path: &Path) -> Result<Self, KiraError> {
        if !path.is_file() {
            return Err(KiraError::ManifestMissing(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|err| KiraError::ManifestRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> ManifestReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(reader);
        Self {
            reader,
            done: false,
        }
    }

    /// Next data row. A row that cannot be decoded comes back as an error
    /// and reading continues with the following row; an I/O error ends the
    /// stream.
    pub fn next_row(&mut self) -> Option<Result<ManifestRow, KiraError>> {
        if self.done {
            return None;
        }
        let mut record = StringRecord::new();
        let fallback_line = self.reader.position().line();
        match self.reader.read_record(&mut record) {
            Ok(true) => {
                let line = record
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(fallback_line);
                Some(Ok(ManifestRow::from_record(line, &record)))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                let line = err
                    .position()
                    .map(|position| position.line())
                    .unwrap_or(fallback_line);
                if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                    self.done = true;
                }
                Some(Err(KiraError::ManifestRow {
                    line,
                    message: err.to_string(),
                }))
            }
        }
    }
}

impl<R: Read> Iterator for ManifestReader<R> {
    type Item = Result<ManifestRow, KiraError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn rows(input: &str) -> Vec<Result<ManifestRow, KiraError>> {
        ManifestReader::from_reader(input.as_bytes()).collect()
    }

    #[test]
    fn header_is_skipped_and_assembly_defaults() {
        let parsed = rows("accession\tname\nGCF_000001405\tGRCh38\nGCA_000005845.2\n");
        assert_eq!(parsed.len(), 2);
        let first = parsed[0].as_ref().unwrap();
        assert_eq!(first.accession, "GCF_000001405");
        assert_eq!(first.assembly, "GRCh38");
        assert_eq!(first.line, 2);
        let second = parsed[1].as_ref().unwrap();
        assert_eq!(second.assembly, DEFAULT_ASSEMBLY);
        assert_eq!(second.line, 3);
    }

    #[test]
    fn empty_first_column_is_blank() {
        let parsed = rows("acc\tasm\n\tGRCh38\nGCF_000001405\t\n");
        assert!(parsed[0].as_ref().unwrap().is_blank());
        let row = parsed[1].as_ref().unwrap();
        assert!(!row.is_blank());
        assert_eq!(row.assembly, DEFAULT_ASSEMBLY);
    }

    #[test]
    fn extra_columns_are_tolerated() {
        let parsed = rows("acc\tasm\nGCF_000001405\tGRCh38\thuman\t9606\n");
        assert_eq!(parsed[0].as_ref().unwrap().assembly, "GRCh38");
    }

    #[test]
    fn undecodable_row_is_reported_and_reading_continues() {
        let mut input = b"acc\tasm\n".to_vec();
        input.extend_from_slice(b"GCF_\xff\xfe\tbad\n");
        input.extend_from_slice(b"GCF_000001405\tGRCh38\n");
        let parsed: Vec<_> = ManifestReader::from_reader(input.as_slice()).collect();
        assert_matches!(parsed[0], Err(KiraError::ManifestRow { .. }));
        assert_eq!(parsed[1].as_ref().unwrap().accession, "GCF_000001405");
    }

    #[test]
    fn missing_file_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let err = ManifestReader::open(&temp.path().join("absent.tsv")).err().unwrap();
        assert_matches!(err, KiraError::ManifestMissing(_));
    }
}
