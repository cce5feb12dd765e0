use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::{fs, io};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

mod key;

pub use key::Key;

#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("no such entity")]
    NoSuchEntity,
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("collection lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, DatastoreError>;

/// Equality constraint on a top level property of the stored entities.
#[derive(Clone, Debug)]
pub struct Filter {
    field: String,
    value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    fn matches(&self, properties: &Value) -> bool {
        properties.get(&self.field) == Some(&self.value)
    }
}

/// Key-value store grouping entities by kind.
///
/// Every kind lives in its own collection guarded by a mutex, so operations
/// on a single kind are atomic with respect to each other. When the store
/// is opened on a directory each collection is persisted to
/// `<dir>/<kind>.json` after every mutation.
pub struct Database {
    dir: Option<PathBuf>,
    collections: RwLock<HashMap<String, Arc<Mutex<Collection>>>>,
}

impl Database {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: Some(dir),
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Store without persistence, everything is lost on drop.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Allocates a new key of the given kind and stores `entity` under it.
    pub fn put_new<T>(&self, kind: &str, entity: &T) -> Result<Key>
    where
        T: Serialize,
    {
        let properties = serde_json::to_value(entity)?;
        let collection_mutex = self.collection(kind)?;
        let mut collection = collection_mutex
            .lock()
            .map_err(|_| DatastoreError::Poisoned)?;
        let id = collection.insert(properties)?;
        Ok(Key::new(kind, id))
    }

    pub fn get<T>(&self, key: &Key) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let collection_mutex = self.collection(key.kind())?;
        let collection = collection_mutex
            .lock()
            .map_err(|_| DatastoreError::Poisoned)?;
        let entity = collection
            .find_one(key.id())
            .ok_or(DatastoreError::NoSuchEntity)?;
        Ok(serde_json::from_value(entity.properties.clone())?)
    }

    /// Returns every entity of `kind` matching the optional filter together
    /// with its key, in insertion order.
    pub fn query<T>(&self, kind: &str, filter: Option<&Filter>) -> Result<Vec<(Key, T)>>
    where
        T: DeserializeOwned,
    {
        let collection_mutex = self.collection(kind)?;
        let collection = collection_mutex
            .lock()
            .map_err(|_| DatastoreError::Poisoned)?;
        let results: Result<Vec<(Key, T)>> = collection
            .find(|properties| filter.map_or(true, |f| f.matches(properties)))
            .map(|entity| {
                let data: T = serde_json::from_value(entity.properties.clone())?;
                Ok::<_, DatastoreError>((Key::new(kind, entity.id), data))
            })
            .collect();
        results
    }

    pub fn delete(&self, key: &Key) -> Result<()> {
        let collection_mutex = self.collection(key.kind())?;
        let mut collection = collection_mutex
            .lock()
            .map_err(|_| DatastoreError::Poisoned)?;
        match collection.delete_one(key.id())? {
            Some(_) => Ok(()),
            None => Err(DatastoreError::NoSuchEntity),
        }
    }

    fn collection(&self, kind: &str) -> Result<Arc<Mutex<Collection>>> {
        {
            let collections = self
                .collections
                .read()
                .map_err(|_| DatastoreError::Poisoned)?;
            if let Some(collection) = collections.get(kind) {
                return Ok(collection.clone());
            }
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| DatastoreError::Poisoned)?;
        // another request may have loaded it between the two locks
        if let Some(collection) = collections.get(kind) {
            return Ok(collection.clone());
        }
        let collection = Arc::new(Mutex::new(Collection::load(kind, self.dir.as_deref())?));
        collections.insert(kind.to_string(), collection.clone());
        Ok(collection)
    }
}

fn read_data<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut file = fs::File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let data: T = serde_json::from_str(&contents)?;
    Ok(data)
}

fn write_data<T>(path: &Path, data: &T) -> Result<()>
where
    T: Serialize,
{
    let tmp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    let serialized_data = serde_json::to_string_pretty(data)?;
    file.write_all(serialized_data.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[derive(Clone, Serialize, Deserialize)]
struct StoredEntity {
    id: Uuid,
    properties: Value,
}

#[derive(Default, Serialize, Deserialize)]
struct DataContainer {
    count: usize,
    entities: Vec<StoredEntity>,
}

struct Collection {
    path: Option<PathBuf>,
    data_container: DataContainer,
}

impl Collection {
    fn load(kind: &str, directory: Option<&Path>) -> Result<Self> {
        let path = directory.map(|dir| dir.join(format!("{}.json", kind)));
        let data_container = match &path {
            Some(path) if path.exists() => read_data(path)?,
            _ => DataContainer::default(),
        };
        log::debug!(
            "loaded collection {} with {} entities",
            kind,
            data_container.entities.len()
        );
        Ok(Self {
            path,
            data_container,
        })
    }

    fn save(&mut self) -> Result<()> {
        self.data_container.count = self.data_container.entities.len();
        match &self.path {
            Some(path) => write_data(path, &self.data_container),
            None => Ok(()),
        }
    }

    fn find_one(&self, id: Uuid) -> Option<&StoredEntity> {
        self.data_container
            .entities
            .iter()
            .find(|entity| entity.id == id)
    }

    fn find<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = &'a StoredEntity> + 'a
    where
        F: Fn(&Value) -> bool + 'a,
    {
        self.data_container
            .entities
            .iter()
            .filter(move |entity| predicate(&entity.properties))
    }

    fn insert(&mut self, properties: Value) -> Result<Uuid> {
        let mut id = Uuid::new_v4();
        while self.find_one(id).is_some() {
            id = Uuid::new_v4();
        }
        self.data_container
            .entities
            .push(StoredEntity { id, properties });
        if let Err(e) = self.save() {
            self.data_container.entities.pop();
            self.data_container.count = self.data_container.entities.len();
            return Err(e);
        }
        Ok(id)
    }

    fn delete_one(&mut self, id: Uuid) -> Result<Option<StoredEntity>> {
        let Some(index) = self
            .data_container
            .entities
            .iter()
            .position(|entity| entity.id == id)
        else {
            return Ok(None);
        };
        let entity = self.data_container.entities.remove(index);
        if let Err(e) = self.save() {
            self.data_container.entities.insert(index, entity);
            self.data_container.count = self.data_container.entities.len();
            return Err(e);
        }
        Ok(Some(entity))
    }
}
