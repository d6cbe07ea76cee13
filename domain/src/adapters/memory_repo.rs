use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{CoreError, GameRecord, HardwareRecord, RegistryRepository};

#[derive(Default)]
struct Collections {
    hardware: Vec<HardwareRecord>,
    games: Vec<GameRecord>,
}

/// In-memory registry. Both collections sit behind one readers-writer lock;
/// appends take it exclusively, lists take it shared.
pub struct InMemoryRegistry {
    inner: RwLock<Collections>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, CoreError> {
        self.inner
            .read()
            .map_err(|_| CoreError::Repository("rwlock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, CoreError> {
        self.inner
            .write()
            .map_err(|_| CoreError::Repository("rwlock poisoned".into()))
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryRepository for InMemoryRegistry {
    fn add_hardware(&self, record: HardwareRecord) -> Result<usize, CoreError> {
        let mut inner = self.write()?;
        inner.hardware.push(record);
        Ok(inner.hardware.len())
    }

    fn add_game(&self, record: GameRecord) -> Result<usize, CoreError> {
        let mut inner = self.write()?;
        inner.games.push(record);
        Ok(inner.games.len())
    }

    fn list_hardware(&self) -> Result<Vec<HardwareRecord>, CoreError> {
        Ok(self.read()?.hardware.clone())
    }

    fn list_games(&self) -> Result<Vec<GameRecord>, CoreError> {
        Ok(self.read()?.games.clone())
    }
}
