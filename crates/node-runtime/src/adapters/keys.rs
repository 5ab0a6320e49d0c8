//! Node key file: one line holding the hex-encoded Ed25519 seed.

use shared_crypto::Ed25519KeyPair;
use shared_types::NodeId;
use std::path::Path;

/// Load the keypair at `path`, or generate and store a new one.
pub fn load_or_create(path: &Path, node_id: NodeId) -> Result<Ed25519KeyPair, String> {
    if path.exists() {
        let seed = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        return Ed25519KeyPair::from_hex_seed(node_id, &seed).map_err(|e| e.to_string());
    }

    let keypair = Ed25519KeyPair::generate(node_id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    std::fs::write(path, keypair.to_hex_seed()).map_err(|e| e.to_string())?;
    restrict_permissions(path)?;
    tracing::info!("[runtime] 🔑 Generated node key at {}", path.display());
    Ok(keypair)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|e| e.to_string())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), String> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Signer;

    #[test]
    fn test_key_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("node.key");

        let first = load_or_create(&path, NodeId::new("N1")).unwrap();
        let second = load_or_create(&path, NodeId::new("N1")).unwrap();

        assert_eq!(first.public_key(), second.public_key());
    }

    #[test]
    fn test_corrupt_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");
        std::fs::write(&path, "not hex").unwrap();

        assert!(load_or_create(&path, NodeId::new("N1")).is_err());
    }
}
