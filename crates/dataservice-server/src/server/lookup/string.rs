use dataservice_core::{Error, Result};

/// Ordered strings served by `GetString`, addressed by position.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub const fn new(strings: Vec<String>) -> Self {
        Self { strings }
    }

    /// Returns the string at `index`.
    ///
    /// The index arrives as a signed wire integer and is range-checked before
    /// any conversion, so negative values never wrap into valid positions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StringNotFound`] unless `0 <= index < len`.
    pub fn get(&self, index: i64) -> Result<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .ok_or(Error::StringNotFound { index })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl FromIterator<String> for StringTable {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StringTable {
        ["foo", "bar", "spam", "ham", "eggs"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn returns_strings_in_range() {
        let table = table();
        let expected = ["foo", "bar", "spam", "ham", "eggs"];
        for (i, s) in expected.iter().enumerate() {
            assert_eq!(table.get(i as i64), Ok(*s));
        }
    }

    #[test]
    fn out_of_range_is_not_found() {
        let table = table();
        for index in [5, 6, i64::MAX, -1, -5, i64::MIN] {
            assert_eq!(table.get(index), Err(Error::StringNotFound { index }));
        }
        assert_eq!(
            table.get(5).unwrap_err().to_string(),
            "String with index 5 not found"
        );
    }

    #[test]
    fn empty_table_has_no_valid_index() {
        let table = StringTable::default();
        assert!(table.is_empty());
        assert!(table.get(0).is_err());
        assert!(table.get(-1).is_err());
    }
}
