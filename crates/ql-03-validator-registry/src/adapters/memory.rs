use crate::domain::{RegistryResult, ValidatorNode};
use crate::ports::RegistryPersistence;
use parking_lot::Mutex;

/// Volatile registry storage.
#[derive(Debug, Default)]
pub struct InMemoryRegistryStore {
    nodes: Mutex<Vec<ValidatorNode>>,
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<ValidatorNode>) -> Self {
        Self {
            nodes: Mutex::new(nodes),
        }
    }
}

impl RegistryPersistence for InMemoryRegistryStore {
    fn load(&self) -> RegistryResult<Vec<ValidatorNode>> {
        Ok(self.nodes.lock().clone())
    }

    fn save(&self, nodes: &[ValidatorNode]) -> RegistryResult<()> {
        *self.nodes.lock() = nodes.to_vec();
        Ok(())
    }
}
