//! Health reporting.

use serde::{Deserialize, Serialize};

use crate::ports::{BrokerClient, EventStore};

/// Storage and transport connectivity as independent booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub storage_ok: bool,
    pub broker_ok: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.storage_ok && self.broker_ok
    }
}

/// Probe storage (a counts round trip) and the broker (a connect ping).
pub async fn check_health(store: &dyn EventStore, broker: &dyn BrokerClient) -> HealthReport {
    HealthReport {
        storage_ok: store.counts_by_state().await.is_ok(),
        broker_ok: broker.connect().await.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBroker;
    use crate::store::InMemoryEventStore;

    #[tokio::test]
    async fn health_booleans_are_independent() {
        let store = InMemoryEventStore::new();
        let broker = InMemoryBroker::new();

        let report = check_health(&store, &broker).await;
        assert!(report.storage_ok);
        assert!(report.broker_ok);
        assert!(report.is_healthy());

        broker.set_available(false);
        let report = check_health(&store, &broker).await;
        assert!(report.storage_ok);
        assert!(!report.broker_ok);
        assert!(!report.is_healthy());
    }
}
