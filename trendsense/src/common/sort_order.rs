/// Specifies the direction for sorting documents.
///
/// # Purpose
/// Mirrors the `1` / `-1` direction convention of MongoDB sort specifications
/// while keeping the direction typed everywhere inside the crate.
///
/// # Usage
/// ```text
/// let options = order_by("name", SortOrder::Ascending);
/// let docs = adapter.find("companies", &all(), &options)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z, oldest to newest)
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A, newest to oldest)
    Descending,
}

impl SortOrder {
    /// Maps a MongoDB-style direction to a sort order. Any negative number is
    /// descending, everything else ascending.
    pub fn from_direction(direction: i64) -> SortOrder {
        if direction < 0 {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }

    /// Returns the MongoDB-style direction, `1` or `-1`.
    pub fn as_direction(&self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}
