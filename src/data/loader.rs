use std::fs::File;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use csv::StringRecord;

use super::model::{LoadStats, Record, Table};
use crate::error::DataSourceError;

pub const COL_YEAR: &str = "annee";
pub const COL_PATHOLOGY: &str = "patho_niv1";
pub const COL_AGE_BRACKET: &str = "libelle_classe_age";
pub const COL_SEX: &str = "libelle_sexe";
pub const COL_REGION: &str = "region";
pub const COL_COUNT: &str = "Ntop";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// How the source file is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// Years kept, inclusive on both ends.
    pub years: RangeInclusive<i32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            years: 2015..=2022,
        }
    }
}

/// Load the extract from a delimited file.
///
/// Only a missing file or an unusable header fail the load. Rows with more
/// fields than the header or an unparseable count are skipped, rows whose
/// year is non-numeric or outside `options.years` are dropped; both are
/// counted in [`Table::stats`]. Short rows are kept, their missing cells read
/// as empty.
pub fn load_csv(path: &Path, options: &LoadOptions) -> Result<Table, DataSourceError> {
    let file = File::open(path).map_err(|source| DataSourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let table = load_reader(file, options)?;
    log::info!("Loaded {} from {}", describe(&table.stats), path.display());
    Ok(table)
}

/// Same as [`load_csv`] over any reader.
pub fn load_reader<R: io::Read>(reader: R, options: &LoadOptions) -> Result<Table, DataSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::locate(reader.headers().map_err(DataSourceError::Header)?)?;

    let mut stats = LoadStats::default();
    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_io_error() => {
                log::warn!("Stopped reading after row {row_no}: {e}");
                break;
            }
            Err(e) => {
                stats.rows_read += 1;
                stats.malformed += 1;
                log::debug!("Skipping row {row_no}: {e}");
                continue;
            }
        };
        stats.rows_read += 1;

        match parse_row(&row, &columns, &options.years) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => stats.out_of_range += 1,
            Err(e) => {
                stats.malformed += 1;
                log::debug!("Skipping row {row_no}: {e}");
            }
        }
    }

    stats.kept = records.len();
    if stats.malformed > 0 {
        log::warn!("Skipped {} malformed rows", stats.malformed);
    }

    Ok(Table::from_records(records, stats))
}

fn describe(stats: &LoadStats) -> String {
    format!(
        "{} rows ({} read, {} malformed, {} outside the year range)",
        stats.kept, stats.rows_read, stats.malformed, stats.out_of_range
    )
}

// ---------------------------------------------------------------------------
// Source identity
// ---------------------------------------------------------------------------

/// Identifies a loaded file so an unchanged file is not parsed twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceId {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceId {
    pub fn of(path: &Path) -> io::Result<Self> {
        let path = path.canonicalize()?;
        let meta = std::fs::metadata(&path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
            path,
        })
    }
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

struct Columns {
    width: usize,
    year: usize,
    pathology: usize,
    age_bracket: usize,
    sex: usize,
    region: usize,
    count: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, DataSourceError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(DataSourceError::MissingColumn(name))
        };
        Ok(Self {
            width: headers.len(),
            year: find(COL_YEAR)?,
            pathology: find(COL_PATHOLOGY)?,
            age_bracket: find(COL_AGE_BRACKET)?,
            sex: find(COL_SEX)?,
            region: find(COL_REGION)?,
            count: find(COL_COUNT)?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum RowError {
    #[error("{0} fields, the header has {1}")]
    TooManyFields(usize, usize),
    #[error("'{0}' is not a patient count")]
    Count(String),
}

/// `Ok(None)` means the row is well-formed but its year is not kept.
fn parse_row(
    row: &StringRecord,
    cols: &Columns,
    years: &RangeInclusive<i32>,
) -> Result<Option<Record>, RowError> {
    if row.len() > cols.width {
        return Err(RowError::TooManyFields(row.len(), cols.width));
    }
    let cell = |idx: usize| row.get(idx).unwrap_or("");

    let Some(year) = parse_year(cell(cols.year)).filter(|y| years.contains(y)) else {
        return Ok(None);
    };

    Ok(Some(Record {
        year,
        pathology: label(cell(cols.pathology)),
        age_bracket: label(cell(cols.age_bracket)),
        sex: label(cell(cols.sex)),
        region: parse_integral(cell(cols.region)),
        patient_count: parse_count(cell(cols.count))?,
    }))
}

fn label(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Numeric coercion of the year: anything that is not an integral number
/// becomes `None` and is dropped by the range filter.
fn parse_year(s: &str) -> Option<i32> {
    parse_integral(s).and_then(|y| i32::try_from(y).ok())
}

/// Integers, also accepted in float notation (`"2018.0"`).
fn parse_integral(s: &str) -> Option<i64> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_count(s: &str) -> Result<Option<f64>, RowError> {
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(RowError::Count(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "annee;patho_niv1;patho_niv2;libelle_classe_age;libelle_sexe;region;Ntop";

    fn load(body: &str) -> Table {
        let text = format!("{HEADER}\n{body}");
        load_reader(text.as_bytes(), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn keeps_rows_in_year_range() {
        let table = load(
            "2014;Maladies psychiatriques;x;de 0 à 4 ans;hommes;11;10\n\
             2015;Maladies psychiatriques;x;de 0 à 4 ans;hommes;11;20\n\
             2022;Maladies psychiatriques;x;de 0 à 4 ans;hommes;11;30\n\
             2023;Maladies psychiatriques;x;de 0 à 4 ans;hommes;11;40\n",
        );
        assert_eq!(table.year_list(), vec![2015, 2022]);
        assert_eq!(table.stats.out_of_range, 2);
        assert_eq!(table.stats.kept, 2);
    }

    #[test]
    fn non_numeric_year_is_dropped_not_an_error() {
        let table = load(
            "deux mille;Maladies psychiatriques;x;de 0 à 4 ans;hommes;11;10\n\
             2019;Maladies psychiatriques;x;de 0 à 4 ans;hommes;11;20\n",
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].year, 2019);
        assert_eq!(table.stats.out_of_range, 1);
        assert_eq!(table.stats.malformed, 0);
    }

    #[test]
    fn float_notation_year_is_coerced() {
        let table = load("2018.0;A;x;tous âges;tous sexes;99;5\n2018.5;A;x;tous âges;tous sexes;99;5\n");
        assert_eq!(table.year_list(), vec![2018]);
        assert_eq!(table.stats.out_of_range, 1);
    }

    #[test]
    fn malformed_rows_are_skipped_and_counted() {
        let table = load(
            "2019;A;x;de 0 à 4 ans;hommes;11;10\n\
             2019;A;x;de 0 à 4 ans;hommes;11;1;extra\n\
             2019;A;x;de 0 à 4 ans;hommes;11;beaucoup\n\
             2019;A;x;de 0 à 4 ans;hommes;11;-3\n\
             2020;A;x;de 0 à 4 ans;femmes;11;5\n",
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.stats.malformed, 3);
        assert_eq!(table.stats.rows_read, 5);
    }

    #[test]
    fn short_rows_are_kept_with_missing_trailing_cells() {
        let text = "annee;patho_niv1;libelle_classe_age;libelle_sexe;region;Ntop;Npop\n\
                    2019;Maladies psychiatriques;de 0 à 4 ans;hommes;11;100;5000\n\
                    2019;Maladies psychiatriques;de 5 à 9 ans;femmes;24;250\n\
                    2019;Maladies psychiatriques;de 5 à 9 ans\n";
        let table = load_reader(text.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.stats.kept, 3);
        assert_eq!(table.stats.malformed, 0);
        let total: f64 = table.records.iter().map(Record::count).sum();
        assert_eq!(total, 350.0);
        let short = &table.records[2];
        assert_eq!(short.sex, None);
        assert_eq!(short.region, None);
        assert_eq!(short.patient_count, None);
    }

    #[test]
    fn empty_cells_become_missing_values() {
        let table = load("2019;;x;;;;\n");
        let r = &table.records[0];
        assert_eq!(r.pathology, None);
        assert_eq!(r.age_bracket, None);
        assert_eq!(r.sex, None);
        assert_eq!(r.region, None);
        assert_eq!(r.patient_count, None);
    }

    #[test]
    fn cells_are_trimmed_and_columns_found_by_name() {
        let text = "Ntop;region;libelle_sexe;libelle_classe_age;patho_niv1;annee\n\
                    42 ; 24 ; femmes ; de 5 à 9 ans ; Maladies psychiatriques ; 2021\n";
        let table = load_reader(text.as_bytes(), &LoadOptions::default()).unwrap();
        let r = &table.records[0];
        assert_eq!(r.year, 2021);
        assert_eq!(r.region, Some(24));
        assert_eq!(r.sex.as_deref(), Some("femmes"));
        assert_eq!(r.age_bracket.as_deref(), Some("de 5 à 9 ans"));
        assert_eq!(r.patient_count, Some(42.0));
    }

    #[test]
    fn non_numeric_region_forms_no_region() {
        let table = load("2019;A;x;de 0 à 4 ans;hommes;2A;10\n");
        assert_eq!(table.records[0].region, None);
        assert_eq!(table.stats.malformed, 0);
    }

    /// Hands out `data` once, then fails every read.
    struct FailsAfter<'a> {
        data: &'a [u8],
    }

    impl io::Read for FailsAfter<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "device unplugged"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn io_error_mid_file_keeps_rows_read_so_far() {
        let text = format!("{HEADER}\n2019;Maladies psychiatriques;x;tous âges;tous sexes;99;7\n");
        let reader = FailsAfter {
            data: text.as_bytes(),
        };
        let table = load_reader(reader, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].count(), 7.0);
        assert_eq!(table.stats.rows_read, 1);
        assert_eq!(table.stats.malformed, 0);
    }

    #[test]
    fn missing_column_is_a_data_source_error() {
        let text = "annee;patho_niv1;libelle_classe_age;libelle_sexe;region\n2019;A;x;y;11\n";
        let err = load_reader(text.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataSourceError::MissingColumn("Ntop")));
    }

    #[test]
    fn empty_input_has_no_usable_header() {
        let err = load_reader(&b""[..], &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataSourceError::MissingColumn(COL_YEAR)));
    }

    #[test]
    fn missing_file_is_a_data_source_error() {
        let err = load_csv(Path::new("/nonexistent/effectifs.csv"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, DataSourceError::Open { .. }));
    }

    #[test]
    fn custom_delimiter_and_year_range() {
        let options = LoadOptions {
            delimiter: b',',
            years: 2019..=2019,
        };
        let text = "annee,patho_niv1,libelle_classe_age,libelle_sexe,region,Ntop\n\
                    2019,A,x,y,11,1\n2020,A,x,y,11,1\n";
        let table = load_reader(text.as_bytes(), &options).unwrap();
        assert_eq!(table.year_list(), vec![2019]);
    }

    #[test]
    fn source_id_tracks_file_changes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        file.flush().unwrap();
        let first = SourceId::of(file.path()).unwrap();
        assert_eq!(first, SourceId::of(file.path()).unwrap());

        writeln!(file, "2019;A;x;y;z;11;1").unwrap();
        file.flush().unwrap();
        let second = SourceId::of(file.path()).unwrap();
        assert_ne!(first.len, second.len);
        assert_ne!(first, second);
    }

    #[test]
    fn load_csv_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "2019;Maladies psychiatriques;x;tous âges;tous sexes;99;1000").unwrap();
        file.flush().unwrap();
        let table = load_csv(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].count(), 1000.0);
    }
}
