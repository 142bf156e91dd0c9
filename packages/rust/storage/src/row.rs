//! Insertable catalog rows and conversions to and from libSQL values.

use frbsync_shared::CatalogValue;

/// An ordered set of `(column, value)` cells bound for one `INSERT`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRow {
    cells: Vec<(String, CatalogValue)>,
}

impl CatalogRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column`, replacing any earlier value for it.
    pub fn set(&mut self, column: impl Into<String>, value: CatalogValue) {
        let column = column.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CatalogValue> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Drop every cell whose column is not in `declared`.
    /// Returns the names of the dropped columns.
    pub fn retain_declared(&mut self, declared: &[String]) -> Vec<String> {
        let mut dropped = Vec::new();
        self.cells.retain(|(c, _)| {
            let keep = declared.iter().any(|d| d == c);
            if !keep {
                dropped.push(c.clone());
            }
            keep
        });
        dropped
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn values(&self) -> Vec<libsql::Value> {
        self.cells.iter().map(|(_, v)| to_sql(v)).collect()
    }
}

pub(crate) fn to_sql(value: &CatalogValue) -> libsql::Value {
    match value {
        CatalogValue::Integer(i) => libsql::Value::Integer(*i),
        CatalogValue::Real(f) => libsql::Value::Real(*f),
        CatalogValue::Text(s) => libsql::Value::Text(s.clone()),
    }
}

pub(crate) fn from_sql(value: libsql::Value) -> Option<CatalogValue> {
    match value {
        libsql::Value::Null => None,
        libsql::Value::Integer(i) => Some(CatalogValue::Integer(i)),
        libsql::Value::Real(f) => Some(CatalogValue::Real(f)),
        libsql::Value::Text(s) => Some(CatalogValue::Text(s)),
        libsql::Value::Blob(b) => Some(CatalogValue::Text(String::from_utf8_lossy(&b).into_owned())),
    }
}

/// Quote an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_cell() {
        let mut row = CatalogRow::new();
        row.set("DM", CatalogValue::Real(1.0));
        row.set("DM", CatalogValue::Real(2.0));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("DM"), Some(&CatalogValue::Real(2.0)));
    }

    #[test]
    fn retain_declared_reports_dropped_columns() {
        let mut row = CatalogRow::new();
        row.set("Name", CatalogValue::Text("FRB20240501A".into()));
        row.set("mjd", CatalogValue::Real(60431.2));
        row.set("ra", CatalogValue::Real(1.0));

        let dropped = row.retain_declared(&["Name".into(), "ra".into()]);
        assert_eq!(dropped, vec!["mjd"]);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["Name", "ra"]);
    }

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_ident("dec"), "\"dec\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
