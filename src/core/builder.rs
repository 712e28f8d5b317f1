use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    core::{Config, coordinator::Coordinator},
    equipartition::EquipartitionTaskContainer,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Coordinator`].
pub struct CoordinatorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive every published event through dedicated workers
    /// with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the coordinator and starts its event listener.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Coordinator {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let container = Arc::new(
            EquipartitionTaskContainer::new(self.cfg.duplicate_keys).with_bus(bus.clone()),
        );

        Coordinator::new_internal(self.cfg, bus, subs, container, CancellationToken::new())
    }
}
