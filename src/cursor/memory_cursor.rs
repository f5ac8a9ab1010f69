use std::{cell::Cell, ffi::OsString, fs};

use serde_json::Value;

use crate::{
    cursor::{CursorError, ResultCursor, ResultRow, RowData},
    model::{NO_ROW, RowIdentity},
};

/// In-memory `ResultCursor` over a fixed list of rows.
///
/// Position lives in a `Cell` so the cursor can be advanced through a shared
/// reference while a cache borrows it.
#[derive(Debug)]
pub struct MemoryCursor {
    rows: Vec<ResultRow>,
    position: Cell<RowIdentity>,
    unavailable: Cell<bool>,
}

impl MemoryCursor {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows, position: Cell::new(NO_ROW), unavailable: Cell::new(false) }
    }

    pub fn load_from_json(json_value: Value) -> Result<Self, String> {
        // Guard: Check if it's a JSON Array
        let Value::Array(items) = json_value else {
            return Err("Informed JSON does not contain a JSON array in the root".to_string());
        };

        let rows = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| ResultRow::from_value(item).map_err(|e| format!("Row {}: {}", i, e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rows))
    }

    pub fn load_from_file(file_path: &OsString) -> Result<Self, String> {
        let file_path_lossy = file_path.to_string_lossy();

        let file_content = fs::read_to_string(file_path)
            .map_err(|_| format!("Could not read file {}", file_path_lossy))?;

        let json_value = serde_json::from_str::<Value>(&file_content)
            .map_err(|_| format!("File {} does not contain valid JSON", file_path_lossy))?;

        Self::load_from_json(json_value)
            .map_err(|error| format!("Error to process the file {}. Details: {}", file_path_lossy, error))
    }

    /// Advance to the next row. Returns `false` once the cursor is past the
    /// last row; from then on there is no current row.
    pub fn next(&self) -> bool {
        let len = self.rows.len() as RowIdentity;
        let next = (self.position.get() + 1).min(len);
        self.position.set(next);
        next < len
    }

    pub fn seek(&self, position: RowIdentity) -> bool {
        if position < NO_ROW || position >= self.rows.len() as RowIdentity {
            return false;
        }
        self.position.set(position);
        true
    }

    pub fn reset(&self) {
        self.position.set(NO_ROW);
    }

    /// Make `current_row_identity` fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for MemoryCursor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ResultCursor for MemoryCursor {
    fn current_row_identity(&self) -> Result<RowIdentity, CursorError> {
        if self.unavailable.get() {
            return Err(CursorError::new("current row index is unavailable"));
        }
        Ok(self.position.get())
    }

    fn current_row(&self) -> Option<&dyn RowData> {
        let position = usize::try_from(self.position.get()).ok()?;
        self.rows.get(position).map(|row| row as &dyn RowData)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn cursor() -> MemoryCursor {
        MemoryCursor::load_from_json(json!([
            { "id": 1, "name": "Alice" },
            { "id": 2, "name": "Bruno" }
        ]))
        .unwrap()
    }

    #[test]
    fn starts_before_first_row_without_data() {
        let c = cursor();
        assert_eq!(c.current_row_identity(), Ok(NO_ROW));
        assert!(c.current_row().is_none());
    }

    #[test]
    fn next_walks_rows_then_stops() {
        let c = cursor();
        assert!(c.next());
        assert_eq!(c.current_row_identity(), Ok(0));
        assert_eq!(c.current_row().unwrap().field_by_name("name"), Ok(&json!("Alice")));
        assert!(c.next());
        assert_eq!(c.current_row_identity(), Ok(1));
        assert!(!c.next());
        assert_eq!(c.current_row_identity(), Ok(2));
        assert!(c.current_row().is_none());
        assert!(!c.next());
        assert_eq!(c.current_row_identity(), Ok(2));
    }

    #[test]
    fn seek_and_reset() {
        let c = cursor();
        assert!(c.seek(1));
        assert_eq!(c.current_row().unwrap().field_by_index(1), Ok(&json!(2)));
        assert!(!c.seek(5));
        assert_eq!(c.current_row_identity(), Ok(1));
        c.reset();
        assert_eq!(c.current_row_identity(), Ok(NO_ROW));
    }

    #[test]
    fn unavailable_identity_reports_error() {
        let c = cursor();
        c.set_unavailable(true);
        assert!(c.current_row_identity().is_err());
        c.set_unavailable(false);
        assert_eq!(c.current_row_identity(), Ok(NO_ROW));
    }

    #[test]
    fn load_rejects_non_arrays_and_non_object_rows() {
        assert!(MemoryCursor::load_from_json(json!({ "id": 1 })).is_err());
        let err = MemoryCursor::load_from_json(json!([{ "id": 1 }, 7])).unwrap_err();
        assert!(err.starts_with("Row 1:"));
    }

    #[test]
    fn load_from_file_reads_rows() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("rows.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(json!([{ "a": 1 }, { "a": 2 }, { "a": 3 }]).to_string().as_bytes()).unwrap();

        let c = MemoryCursor::load_from_file(&file_path.as_os_str().to_os_string()).unwrap();
        assert_eq!(c.len(), 3);

        let missing = temp_dir.path().join("missing.json");
        assert!(MemoryCursor::load_from_file(&missing.as_os_str().to_os_string()).is_err());
    }
}
