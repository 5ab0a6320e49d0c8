use crate::domain::{repair_chain_document, LedgerError, LedgerResult};
use crate::ports::{ChainPersistence, LoadedChain};
use shared_types::Block;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Chain persisted as a pretty-printed JSON array of blocks.
///
/// Writes go to a sibling temp file which is fsynced and renamed over the
/// target, so a crash leaves either the old or the new document in place.
pub struct JsonFileChainStore {
    path: PathBuf,
}

impl JsonFileChainStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    fn io_error(context: &str, e: std::io::Error) -> LedgerError {
        LedgerError::Persistence(format!("{context}: {e}"))
    }
}

impl ChainPersistence for JsonFileChainStore {
    fn load(&self) -> LedgerResult<Option<LoadedChain>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("[ql-01] 📁 No chain file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(Self::io_error("read chain file", e)),
        };

        let parse_error = match serde_json::from_str::<Vec<Block>>(&raw) {
            Ok(blocks) => {
                tracing::info!(
                    "[ql-01] 💾 Loaded {} blocks from {}",
                    blocks.len(),
                    self.path.display()
                );
                return Ok(Some(LoadedChain {
                    blocks,
                    repair: None,
                }));
            }
            Err(e) => e,
        };

        tracing::warn!(
            "[ql-01] ⚠️ Chain file {} does not parse ({}), attempting repair",
            self.path.display(),
            parse_error
        );

        let (fixed, mut report) = repair_chain_document(&raw).ok_or_else(|| {
            LedgerError::MalformedPersisted(format!("{parse_error}; no repairable syntax found"))
        })?;

        let blocks = serde_json::from_str::<Vec<Block>>(&fixed).map_err(|e| {
            LedgerError::MalformedPersisted(format!("{parse_error}; still invalid after repair: {e}"))
        })?;

        let backup = self.backup_path();
        std::fs::write(&backup, raw.as_bytes()).map_err(|e| Self::io_error("write backup", e))?;
        report.backup_path = Some(backup.display().to_string());

        tracing::warn!(
            "[ql-01] 🩹 Repaired chain file: {} trailing commas, {} trailing bytes dropped, original kept at {}",
            report.trailing_commas_removed,
            report.trailing_bytes_dropped,
            backup.display()
        );

        Ok(Some(LoadedChain {
            blocks,
            repair: Some(report),
        }))
    }

    fn save(&self, chain: &[Block]) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Self::io_error("create data dir", e))?;
            }
        }

        let bytes = serde_json::to_vec_pretty(chain)
            .map_err(|e| LedgerError::Persistence(format!("serialize chain: {e}")))?;

        let temp_path = self.path.with_extension("tmp");
        let mut file =
            std::fs::File::create(&temp_path).map_err(|e| Self::io_error("create temp file", e))?;
        file.write_all(&bytes)
            .map_err(|e| Self::io_error("write temp file", e))?;
        file.sync_all()
            .map_err(|e| Self::io_error("sync temp file", e))?;

        std::fs::rename(&temp_path, &self.path).map_err(|e| Self::io_error("rename chain file", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Hash, NodeId};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileChainStore::new(dir.path().join("chain.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileChainStore::new(dir.path().join("nested/chain.json"));
        let chain = vec![Block::genesis()];

        store.save(&chain).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.blocks, chain);
        assert!(loaded.repair.is_none());
        assert!(!dir.path().join("nested/chain.tmp").exists());
    }

    #[test]
    fn test_trailing_comma_repaired_and_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.json");
        let good = serde_json::to_string_pretty(&vec![Block::genesis()]).unwrap();
        let broken = format!("{},\n]", good.trim_end().trim_end_matches(']'));
        std::fs::write(&path, &broken).unwrap();

        let store = JsonFileChainStore::new(&path);
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.blocks, vec![Block::genesis()]);
        let report = loaded.repair.unwrap();
        assert_eq!(report.trailing_commas_removed, 1);
        let backup = std::fs::read_to_string(dir.path().join("chain.json.bak")).unwrap();
        assert_eq!(backup, broken);
    }

    #[test]
    fn test_unrepairable_file_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.json");
        std::fs::write(&path, "[{\"index\": 0, \"hash\": ").unwrap();

        let result = JsonFileChainStore::new(&path).load();
        assert!(matches!(result, Err(LedgerError::MalformedPersisted(_))));
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.json");
        let mut value = serde_json::to_value(vec![Block::new(
            0,
            Hash::ZERO,
            0,
            vec![],
            NodeId::genesis(),
        )])
        .unwrap();
        value[0]
            .as_object_mut()
            .unwrap()
            .insert("legacy".into(), serde_json::json!(1));
        std::fs::write(&path, value.to_string()).unwrap();

        let result = JsonFileChainStore::new(&path).load();
        assert!(matches!(result, Err(LedgerError::MalformedPersisted(_))));
    }
}
