use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use uuid::Uuid;

use super::DatastoreError;

const SEPARATOR: char = ':';

/// Fully specified address of an entity: its kind plus the id the store
/// allocated for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    kind: String,
    id: Uuid,
}

impl Key {
    pub(super) fn new(kind: &str, id: Uuid) -> Self {
        Self {
            kind: kind.to_string(),
            id,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Opaque, url safe representation of the key.
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}{}{}", self.kind, SEPARATOR, self.id))
    }

    /// Inverse of [`Key::encode`]. Any string that was not produced by
    /// `encode` is rejected with [`DatastoreError::InvalidKey`].
    pub fn decode(encoded: &str) -> Result<Self, DatastoreError> {
        let invalid = || DatastoreError::InvalidKey(encoded.to_string());

        let bytes = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| invalid())?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (kind, id) = raw.split_once(SEPARATOR).ok_or_else(invalid)?;
        if kind.is_empty() {
            return Err(invalid());
        }
        let id = Uuid::parse_str(id).map_err(|_| invalid())?;
        let key = Self::new(kind, id);
        // uuid parsing accepts several spellings, only the encoded one addresses the key
        if key.encode() != encoded {
            return Err(invalid());
        }
        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}
