use serde::Serialize;

use crate::datastore::Key;

/// Wire representation of a stored entity: its encoded key as `id` next to
/// the entity's own fields.
#[derive(Serialize)]
pub struct Keyed<T>
where
    T: Serialize,
{
    pub id: String,
    #[serde(flatten)]
    pub entity: T,
}

impl<T> Keyed<T>
where
    T: Serialize,
{
    pub fn new(key: &Key, entity: T) -> Self {
        Self {
            id: key.encode(),
            entity,
        }
    }
}
