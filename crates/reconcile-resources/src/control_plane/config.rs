use serde::{Deserialize, Serialize};

/// Behaviour knobs of the in-memory control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Describe calls a cluster spends in a transitional status. Zero makes
    /// every cluster operation complete synchronously.
    pub stabilization_delay: u32,
    /// Policies returned per list page.
    pub page_size: usize,
    pub max_clusters: usize,
    /// Actions answered with `AccessDenied`, e.g. `["TagResource"]`.
    pub denied_actions: Vec<String>,
    pub channel_capacity: usize,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            stabilization_delay: 2,
            page_size: 10,
            max_clusters: 16,
            denied_actions: Vec::new(),
            channel_capacity: 32,
        }
    }
}

impl ControlPlaneConfig {
    pub fn with_stabilization_delay(mut self, delay: u32) -> Self {
        self.stabilization_delay = delay;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn deny(mut self, action: impl Into<String>) -> Self {
        self.denied_actions.push(action.into());
        self
    }

    pub fn is_denied(&self, action: &str) -> bool {
        self.denied_actions.iter().any(|a| a == action)
    }
}
