//! Record identifiers

use uuid::Uuid;

use crate::{Error, Result};

/// New random record id
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a record id from a path segment or stored column
///
/// Surrounding whitespace is ignored. The nil UUID is never issued, so it
/// is rejected rather than looked up.
pub fn parse(s: &str) -> Result<Uuid> {
    let id = Uuid::parse_str(s.trim())
        .map_err(|e| Error::InvalidInput(format!("'{}' is not a UUID: {}", s, e)))?;
    if id.is_nil() {
        return Err(Error::InvalidInput("nil UUID is not a record id".to_string()));
    }
    Ok(id)
}
