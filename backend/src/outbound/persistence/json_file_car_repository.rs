//! File-backed car repository.
//!
//! The full set of cars is written as one JSON document. Each write goes to a
//! sibling temp file that is flushed to disk before it is renamed over the
//! snapshot, and the directory is synced after the rename. A crash leaves
//! either the previous or the next snapshot on disk.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::InMemoryCarRepository;
use crate::domain::ports::{CarRepository, CarRepositoryError};
use crate::domain::{Car, OwnerIdentity, PlateNumber};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    cars: Vec<Car>,
}

/// Car repository persisted to a JSON snapshot file.
pub struct JsonFileCarRepository {
    cache: InMemoryCarRepository,
    directory: Arc<Dir>,
    file_name: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileCarRepository {
    /// Open `path`, creating its parent directory when missing.
    ///
    /// A missing file starts an empty registry.
    pub fn open(path: &Path) -> Result<Self, CarRepositoryError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| CarRepositoryError::unavailable("data file path has no file name"))?;

        Dir::create_ambient_dir_all(parent, ambient_authority())
            .and_then(|()| Dir::open_ambient_dir(parent, ambient_authority()))
            .map_err(|error| {
                CarRepositoryError::unavailable(format!(
                    "cannot open data directory {}: {error}",
                    parent.display()
                ))
            })
            .and_then(|directory| Self::load(directory, file_name))
    }

    fn load(directory: Dir, file_name: PathBuf) -> Result<Self, CarRepositoryError> {
        let cars = match directory.read_to_string(&file_name) {
            Ok(raw) => decode_snapshot(&raw)?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(error) => {
                return Err(CarRepositoryError::unavailable(format!(
                    "cannot read {}: {error}",
                    file_name.display()
                )));
            }
        };
        info!(file = %file_name.display(), cars = cars.len(), "car snapshot loaded");
        Ok(Self {
            cache: InMemoryCarRepository::with_cars(cars),
            directory: Arc::new(directory),
            file_name,
            write_lock: Mutex::new(()),
        })
    }

    async fn persist(&self, cars: Vec<Car>) -> Result<(), CarRepositoryError> {
        let body = serde_json::to_vec_pretty(&SnapshotDocument {
            version: SNAPSHOT_VERSION,
            cars,
        })
        .map_err(|error| CarRepositoryError::storage(format!("cannot encode snapshot: {error}")))?;

        let directory = Arc::clone(&self.directory);
        let target = self.file_name.clone();
        tokio::task::spawn_blocking(move || write_atomically(&directory, &target, &body))
            .await
            .map_err(|error| CarRepositoryError::storage(format!("snapshot writer failed: {error}")))?
            .map_err(|error| CarRepositoryError::storage(format!("cannot write snapshot: {error}")))
    }
}

fn decode_snapshot(raw: &str) -> Result<Vec<Car>, CarRepositoryError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let document: SnapshotDocument = serde_json::from_str(raw)
        .map_err(|error| CarRepositoryError::storage(format!("corrupt car snapshot: {error}")))?;
    if document.version != SNAPSHOT_VERSION {
        return Err(CarRepositoryError::storage(format!(
            "unsupported car snapshot version {}",
            document.version
        )));
    }
    Ok(document.cars)
}

fn write_atomically(directory: &Dir, target: &Path, body: &[u8]) -> io::Result<()> {
    let mut temp_name = target.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp = PathBuf::from(temp_name);

    let mut file = directory.create(&temp)?;
    file.write_all(body)?;
    file.sync_all()?;
    drop(file);

    directory.rename(&temp, directory, target)?;
    sync_directory(directory)
}

/// Persist the rename itself by syncing the directory entry.
#[cfg(unix)]
fn sync_directory(directory: &Dir) -> io::Result<()> {
    directory.try_clone()?.into_std_file().sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Dir) -> io::Result<()> {
    Ok(())
}

#[async_trait]
impl CarRepository for JsonFileCarRepository {
    async fn find_by_plate(&self, plate: &PlateNumber) -> Result<Option<Car>, CarRepositoryError> {
        self.cache.find_by_plate(plate).await
    }

    async fn list_by_owner(&self, owner: &OwnerIdentity) -> Result<Vec<Car>, CarRepositoryError> {
        self.cache.list_by_owner(owner).await
    }

    async fn save(&self, car: &Car) -> Result<(), CarRepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut cars = self.cache.snapshot()?;
        match cars.iter_mut().find(|stored| stored.plate() == car.plate()) {
            Some(stored) => *stored = car.clone(),
            None => cars.push(car.clone()),
        }
        cars.sort_by(|left, right| left.plate().cmp(right.plate()));

        self.persist(cars).await?;
        self.cache.insert(car.clone())?;
        debug!(plate = %car.plate(), "car snapshot written");
        Ok(())
    }
}
