use super::{Backing, KeyTag, StoredKey};
use crate::Error;
use std::{collections::HashMap, sync::Arc};

/// A [Backing] that keeps every record in process memory.
///
/// Records (and the scalars inside them) are zeroized when removed, once no caller holds
/// them any longer, or when the backing is dropped.
#[derive(Default)]
pub struct Memory {
    records: HashMap<KeyTag, Arc<StoredKey>>,
}

impl Memory {
    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Backing for Memory {
    fn load(&self, tag: &KeyTag) -> Result<Option<Arc<StoredKey>>, Error> {
        Ok(self.records.get(tag).cloned())
    }

    fn contains(&self, tag: &KeyTag) -> Result<bool, Error> {
        Ok(self.records.contains_key(tag))
    }

    fn insert(&mut self, record: StoredKey) -> Result<(), Error> {
        self.records.insert(record.tag().clone(), Arc::new(record));
        Ok(())
    }

    fn remove(&mut self, tag: &KeyTag) -> Result<bool, Error> {
        Ok(self.records.remove(tag).is_some())
    }

    fn tags(&self) -> Result<Vec<KeyTag>, Error> {
        Ok(self.records.keys().cloned().collect())
    }
}
