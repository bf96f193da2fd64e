//! Read path: `get`.
//!
//! Point lookups check the memtable first (freshest data, including
//! tombstones), then the index chain newest-to-oldest. The first hit wins;
//! a tombstone hit — in either the memtable or a segment — shadows any
//! older value and is reported as [`EngineError::NotFound`].
use crate::{Engine, EngineError};

impl Engine {
    /// Looks up `key`, returning its value or [`EngineError::NotFound`] if
    /// the key is absent or has been deleted.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, EngineError> {
        if let Some(value) = self.mem.get_raw(key) {
            return if value.is_empty() {
                Err(EngineError::NotFound)
            } else {
                Ok(value.to_vec())
            };
        }

        let guard = self.chain.lock().expect("chain mutex poisoned");
        for entry in &guard.entries {
            if !entry.filter.contains(key) {
                continue;
            }
            let Some((start, end)) = entry.index.find(key) else {
                continue;
            };
            let bytes = entry.segment.read_range(start, end as i64)?;
            let records = block::decode(&bytes, true)?;
            if let Ok(i) = records.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
                let (_, value) = &records[i];
                return if value.is_empty() {
                    Err(EngineError::NotFound)
                } else {
                    Ok(value.clone())
                };
            }
        }

        Err(EngineError::NotFound)
    }
}
