use chrono::Utc;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Result, WeatherError},
    model::StoredLocation,
    zip::ZipCode,
};

/// Saved locations, persisted as one JSON object keyed by ZIP code.
///
/// Every mutation rewrites the whole file. If the write fails the in-memory
/// state keeps the mutation and the error is returned; callers should treat
/// the store as best-effort after a storage error. There is no locking
/// against other processes using the same file.
#[derive(Debug)]
pub struct LocationStore {
    path: PathBuf,
    locations: BTreeMap<ZipCode, StoredLocation>,
}

impl LocationStore {
    /// Loads `path`. A missing or empty file is an empty store; unreadable or
    /// invalid content is a [`WeatherError::Storage`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let locations = load(&path)?;
        log::info!("Loaded {} locations from {}", locations.len(), path.display());

        Ok(Self { path, locations })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Inserts or overwrites `zip_code`. An overwrite keeps the favorite flag.
    pub fn add_location(&mut self, zip_code: &str, name: &str) -> Result<()> {
        let zip = ZipCode::try_from(zip_code)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(WeatherError::Validation("Location name must be a non-empty string".into()));
        }

        match self.locations.get_mut(&zip) {
            Some(existing) => {
                existing.name = name.to_string();
                existing.added_at = Some(Utc::now());
            }
            None => {
                self.locations.insert(zip.clone(), StoredLocation::new(name.to_string()));
            }
        }

        self.save()?;
        log::info!("Added location: {name} ({zip})");
        Ok(())
    }

    /// Returns `false`, without touching the file, if `zip_code` was not stored.
    pub fn remove_location(&mut self, zip_code: &str) -> Result<bool> {
        let zip = ZipCode::try_from(zip_code)?;

        let Some(removed) = self.locations.remove(&zip) else {
            return Ok(false);
        };

        self.save()?;
        log::info!("Removed location: {} ({zip})", removed.name);
        Ok(true)
    }

    pub fn set_favorite(&mut self, zip_code: &str, is_favorite: bool) -> Result<()> {
        let zip = ZipCode::try_from(zip_code)?;

        let entry = self
            .locations
            .get_mut(&zip)
            .ok_or_else(|| WeatherError::NotFound(zip.to_string()))?;
        entry.is_favorite = is_favorite;

        self.save()
    }

    pub fn is_favorite(&self, zip_code: &str) -> bool {
        ZipCode::try_from(zip_code)
            .ok()
            .and_then(|zip| self.locations.get(&zip))
            .is_some_and(|loc| loc.is_favorite)
    }

    pub fn get_location(&self, zip_code: &str) -> Result<Option<&StoredLocation>> {
        let zip = ZipCode::try_from(zip_code)?;
        Ok(self.locations.get(&zip))
    }

    /// All stored ZIP codes in ascending order.
    pub fn get_locations(&self) -> Vec<ZipCode> {
        self.locations.keys().cloned().collect()
    }

    pub fn get_favorite_locations(&self) -> BTreeMap<ZipCode, String> {
        self.locations
            .iter()
            .filter(|(_, loc)| loc.is_favorite)
            .map(|(zip, loc)| (zip.clone(), loc.name.clone()))
            .collect()
    }

    pub fn location_names(&self) -> Vec<(ZipCode, String)> {
        self.locations.iter().map(|(zip, loc)| (zip.clone(), loc.name.clone())).collect()
    }

    pub fn clear(&mut self) -> Result<()> {
        let count = self.locations.len();
        self.locations.clear();
        self.save()?;
        log::info!("Cleared {count} locations");
        Ok(())
    }

    /// Writes the whole store to a sibling temp file, then renames it over the target.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| WeatherError::storage(parent, e))?;
        }

        let json = serde_json::to_string_pretty(&self.locations)
            .map_err(|e| WeatherError::storage(&self.path, e))?;

        let tmp = temp_path(&self.path);
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                let _ = fs::remove_file(&tmp);
                log::error!("Error saving locations to {}: {e}", self.path.display());
                WeatherError::storage(&self.path, e)
            })?;

        log::debug!("Saved {} locations to {}", self.locations.len(), self.path.display());
        Ok(())
    }
}

fn load(path: &Path) -> Result<BTreeMap<ZipCode, StoredLocation>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let contents = fs::read_to_string(path).map_err(|e| WeatherError::storage(path, e))?;
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&contents).map_err(|e| {
        log::error!("Error loading locations from {}: {e}", path.display());
        WeatherError::storage(path, e)
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name =
        path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "locations.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
