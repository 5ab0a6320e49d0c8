use crate::domain::{RegistryError, RegistryResult, ValidatorNode};
use crate::ports::RegistryPersistence;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Validator records in a JSON array, rewritten via temp file + rename.
pub struct JsonFileRegistryStore {
    path: PathBuf,
}

impl JsonFileRegistryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

fn io_err(e: std::io::Error) -> RegistryError {
    RegistryError::Persistence(e.to_string())
}

impl RegistryPersistence for JsonFileRegistryStore {
    fn load(&self) -> RegistryResult<Vec<ValidatorNode>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| RegistryError::Persistence(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_err(e)),
        }
    }

    fn save(&self, nodes: &[ValidatorNode]) -> RegistryResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(nodes)
            .map_err(|e| RegistryError::Persistence(e.to_string()))?;
        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_err)
    }
}
