use serde::{Deserialize, Serialize};

/// Datastore kind under which lists are stored.
pub const LIST_KIND: &str = "List";

/// Name of the property holding the creator, used to scope queries.
pub const CREATOR_FIELD: &str = "creator";

/// A todo list header as it is stored. The id is not part of the entity, it
/// is derived from the datastore key, see [`super::keyed::Keyed`].
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub name: String,
    pub creator: Option<String>,
}
