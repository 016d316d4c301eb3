use std::collections::HashMap;
use std::sync::Arc;

use crate::client::ChatClient;

/// Usage scenario a client is configured for. Classification and summary
/// calls may target different models and temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Classification,
    Summary,
}

/// Explicit client registry constructed once at startup and passed down,
/// replacing singleton-by-configuration-key caching.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<Scenario, Arc<dyn ChatClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, scenario: Scenario, client: Arc<dyn ChatClient>) -> Self {
        self.clients.insert(scenario, client);
        self
    }

    pub fn get(&self, scenario: Scenario) -> Option<Arc<dyn ChatClient>> {
        self.clients.get(&scenario).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockChatClient;

    #[test]
    fn test_registry_returns_client_per_scenario() {
        let registry = ClientRegistry::new()
            .with_client(
                Scenario::Classification,
                Arc::new(MockChatClient::always("费用异议咨询")),
            )
            .with_client(Scenario::Summary, Arc::new(MockChatClient::always("摘要")));

        assert!(registry.get(Scenario::Classification).is_some());
        assert!(registry.get(Scenario::Summary).is_some());
    }

    #[test]
    fn test_registry_missing_scenario_is_none() {
        let registry = ClientRegistry::new();
        assert!(registry.get(Scenario::Summary).is_none());
    }
}
