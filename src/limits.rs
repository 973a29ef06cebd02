use crate::constants;

/// Size and count limits of a multipart stream.
///
/// Exceeding a limit never aborts the parse. It is reported to the handler
/// as [`Error::ReachedLimit`](crate::Error::ReachedLimit) and parsing goes on:
/// parts over `max_parts`, `max_part_size` or `max_field_size` are still
/// delivered, while a `write` that takes the stream over `max_total_size` is
/// dropped, as is every later one until `end`.
///
/// # Examples
///
/// ```
/// use multipasta::Limits;
///
/// let limits = Limits::new()
///     .max_parts(10)
///     .max_total_size(15 * 1024 * 1024)
///     .max_field_size(64 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Limits {
    pub(crate) max_parts: u64,
    pub(crate) max_total_size: u64,
    pub(crate) max_part_size: u64,
    pub(crate) max_field_size: u64,
}

impl Limits {
    /// Creates the default limits: unbounded except for fields, which are
    /// held in memory and limited to 1 MiB.
    pub fn new() -> Limits {
        Limits::default()
    }

    /// Sets the maximum number of parts whose headers are accepted.
    pub fn max_parts(mut self, limit: u64) -> Limits {
        self.max_parts = limit;
        self
    }

    /// Sets the maximum number of bytes accepted over the whole stream.
    pub fn max_total_size(mut self, limit: u64) -> Limits {
        self.max_total_size = limit;
        self
    }

    /// Sets the maximum size of one part, headers included.
    pub fn max_part_size(mut self, limit: u64) -> Limits {
        self.max_part_size = limit;
        self
    }

    /// Sets the maximum body size of a part delivered as a field.
    pub fn max_field_size(mut self, limit: u64) -> Limits {
        self.max_field_size = limit;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_parts: constants::DEFAULT_MAX_PARTS,
            max_total_size: constants::DEFAULT_MAX_TOTAL_SIZE,
            max_part_size: constants::DEFAULT_MAX_PART_SIZE,
            max_field_size: constants::DEFAULT_MAX_FIELD_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let limits = Limits::new().max_parts(3).max_part_size(10);

        assert_eq!(limits.max_parts, 3);
        assert_eq!(limits.max_part_size, 10);
        assert_eq!(limits.max_total_size, u64::MAX);
        assert_eq!(limits.max_field_size, 1024 * 1024);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_deserialize_partial() {
        let limits: Limits = serde_json::from_str(r#"{"max_parts": 5}"#).unwrap();
        assert_eq!(limits, Limits::new().max_parts(5));
    }
}
