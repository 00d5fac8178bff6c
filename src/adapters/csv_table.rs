use crate::domain::model::RowRange;
use crate::domain::ports::Table;
use crate::utils::error::{AuditError, Result};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// 以本機 CSV/TSV 檔作為表格；每次寫入儲存格都會立即落地
/// （先寫暫存檔再 rename，中途中斷不會留下半個檔案）。
#[derive(Debug)]
pub struct CsvTable {
    path: PathBuf,
    delimiter: u8,
    rows: Mutex<Vec<Vec<String>>>,
}

impl CsvTable {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let delimiter = Self::delimiter_for(&path);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_path(&path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        tracing::debug!("Opened table {} with {} rows", path.display(), rows.len());

        Ok(Self {
            path,
            delimiter,
            rows: Mutex::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn delimiter_for(path: &Path) -> u8 {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        }
    }

    fn persist(&self, rows: &[Vec<String>]) -> Result<()> {
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .flexible(true)
                .from_path(&tmp_path)?;
            for row in rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl Table for CsvTable {
    async fn header(&self) -> Result<Vec<String>> {
        let rows = self.rows.lock().await;
        Ok(rows.first().cloned().unwrap_or_default())
    }

    async fn read_rows(&self, range: RowRange) -> Result<Vec<(usize, Vec<String>)>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(index, _)| range.contains(*index))
            .map(|(index, cells)| (index, cells.clone()))
            .collect())
    }

    async fn write_cell(&self, row: usize, column: usize, value: &str) -> Result<()> {
        if row < 2 {
            return Err(AuditError::WritebackError {
                row,
                message: "the header row is read-only".to_string(),
            });
        }
        if column == 0 {
            return Err(AuditError::WritebackError {
                row,
                message: "columns are 1-based".to_string(),
            });
        }

        let mut rows = self.rows.lock().await;
        while rows.len() < row {
            rows.push(Vec::new());
        }
        let cells = &mut rows[row - 1];
        while cells.len() < column {
            cells.push(String::new());
        }
        let previous = std::mem::replace(&mut cells[column - 1], value.to_string());

        if let Err(e) = self.persist(&rows) {
            rows[row - 1][column - 1] = previous;
            return Err(AuditError::WritebackError {
                row,
                message: e.to_string(),
            });
        }

        Ok(())
    }

    async fn ensure_column(&self, name: &str) -> Result<usize> {
        let mut rows = self.rows.lock().await;
        if rows.is_empty() {
            rows.push(Vec::new());
        }

        if let Some(position) = rows[0]
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(name.trim()))
        {
            return Ok(position + 1);
        }

        rows[0].push(name.trim().to_string());
        let column = rows[0].len();
        self.persist(&rows)?;
        tracing::info!("Added result column '{}' at position {}", name.trim(), column);
        Ok(column)
    }
}
