use sled::Db;

/// Durable backing store for queue backlogs.
///
/// One sled tree per queue, keyed by the big-endian sequence number of the
/// message. A message is appended when it is published persistently to a
/// durable queue and removed once the delivery is settled, so whatever is in
/// the tree after a restart is exactly the unsettled backlog.
#[derive(Clone)]
pub struct Journal {
    db: Db,
}

impl Journal {
    pub fn open(path: &str) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn append(&self, queue: &str, seq: u64, body: &[u8]) -> Result<(), sled::Error> {
        let tree = self.db.open_tree(queue)?;
        tree.insert(seq.to_be_bytes(), body)?;
        tree.flush()?;
        Ok(())
    }

    pub fn remove(&self, queue: &str, seq: u64) -> Result<(), sled::Error> {
        let tree = self.db.open_tree(queue)?;
        tree.remove(seq.to_be_bytes())?;
        tree.flush()?;
        Ok(())
    }

    /// Loads the journaled backlog for a queue in sequence order.
    pub fn load(&self, queue: &str) -> Result<Vec<(u64, Vec<u8>)>, sled::Error> {
        let tree = self.db.open_tree(queue)?;
        let mut entries = Vec::new();
        for item in tree.iter() {
            let (key, value) = item?;
            if let Ok(key) = <[u8; 8]>::try_from(key.as_ref()) {
                entries.push((u64::from_be_bytes(key), value.to_vec()));
            }
        }
        Ok(entries)
    }
}
