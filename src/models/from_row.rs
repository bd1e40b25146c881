use rusqlite::Row;

/// Maps one result row into a model. Models with child rows (routines,
/// sessions) map their header only and leave the children to the repository.
pub trait FromSqliteRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}
