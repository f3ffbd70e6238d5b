use serde::{Deserialize, Serialize};

/// A worker the coordinator dials at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl WorkerSpec {
    /// The configured name, falling back to the address.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}
