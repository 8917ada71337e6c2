// Application bootstrapper: settings, cache, handler table and bus

use relay_cache::{CacheStatus, IdempotencyCache, InMemoryStore};
use relay_config::{ConfigError, NodeConfig, Settings, Validate};
use relay_events::{
    DispatchReport, EventBus, EventBusConfig, HandlerRegistry, HistoryEntry, Payload,
    RegistrationStatus, RegistryError,
};
use relay_handlers::{
    APPROVAL_INSTANCE_UPDATED, AmountExtractor, ApprovalPlatform, QrGenerator, QrPaymentHandler,
    RuleValidator, ValidationAlertHandler,
};
use std::sync::Arc;
use tracing::info;

/// Errors raised while wiring the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Handler registration failed: {0}")]
    Registry(#[from] RegistryError),
}

/// External capabilities the domain handlers need.
#[derive(Clone)]
pub struct Collaborators {
    pub platform: Arc<dyn ApprovalPlatform>,
    pub qr_generator: Arc<dyn QrGenerator>,
    pub amount_extractor: Arc<dyn AmountExtractor>,
    pub rule_validator: Arc<dyn RuleValidator>,
}

impl Collaborators {
    pub fn new(
        platform: Arc<dyn ApprovalPlatform>,
        qr_generator: Arc<dyn QrGenerator>,
        amount_extractor: Arc<dyn AmountExtractor>,
        rule_validator: Arc<dyn RuleValidator>,
    ) -> Self {
        Self {
            platform,
            qr_generator,
            amount_extractor,
            rule_validator,
        }
    }
}

/// Register every domain handler on the event types it reacts to.
///
/// This is the whole subscription table; nothing registers handlers at
/// runtime.
pub fn register_domain_handlers(
    registry: &mut HandlerRegistry,
    collaborators: &Collaborators,
    nodes: Arc<NodeConfig>,
    cache: IdempotencyCache,
    settings: Arc<Settings>,
) -> Result<(), RegistryError> {
    let qr = QrPaymentHandler::new(
        collaborators.platform.clone(),
        collaborators.qr_generator.clone(),
        collaborators.amount_extractor.clone(),
        nodes,
        cache.clone(),
        settings.clone(),
    );
    let validation = ValidationAlertHandler::new(
        collaborators.platform.clone(),
        collaborators.rule_validator.clone(),
        cache,
        settings,
    );

    registry.register(APPROVAL_INSTANCE_UPDATED, Arc::new(qr))?;
    registry.register(APPROVAL_INSTANCE_UPDATED, Arc::new(validation))?;
    Ok(())
}

/// The wired application a webhook receiver holds on to.
///
/// Owns the settings, the idempotency store and the bus; cheap to clone.
#[derive(Clone)]
pub struct RelayApp {
    settings: Arc<Settings>,
    store: InMemoryStore,
    bus: EventBus,
}

impl RelayApp {
    /// Wire the application from explicit settings and node rules.
    pub fn new(
        settings: Settings,
        nodes: NodeConfig,
        collaborators: Collaborators,
    ) -> Result<Self, AppError> {
        settings.validate()?;
        nodes.validate()?;

        let settings = Arc::new(settings);
        let store = InMemoryStore::new();
        let cache = IdempotencyCache::new(Arc::new(store.clone()), settings.idempotency_ttl());

        let mut registry = HandlerRegistry::new();
        register_domain_handlers(
            &mut registry,
            &collaborators,
            Arc::new(nodes),
            cache,
            settings.clone(),
        )?;

        let status = registry.status();
        info!(
            event_types = status.total_event_types,
            handlers = status.total_handlers,
            ttl_secs = settings.idempotency_ttl_secs,
            "approval-relay bootstrap complete"
        );

        let bus = EventBus::with_config(
            registry,
            EventBusConfig {
                history_capacity: settings.history_capacity,
                ..EventBusConfig::default()
            },
        );

        Ok(Self {
            settings,
            store,
            bus,
        })
    }

    /// Initialize logging, then wire from `RELAY_*` variables and the node
    /// rule file they point at.
    pub fn from_env(collaborators: Collaborators) -> Result<Self, AppError> {
        relay_log::init();
        let (settings, nodes) = relay_config::load()?;
        Self::new(settings, nodes, collaborators)
    }

    /// Publish an `approval.instance.updated` event.
    pub async fn handle_webhook(&self, payload: Payload) -> DispatchReport {
        self.bus.publish(APPROVAL_INSTANCE_UPDATED, payload).await
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.bus.history(limit)
    }

    pub fn registration_status(&self) -> RegistrationStatus {
        self.bus.registration_status()
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.store.status()
    }

    /// Drop every idempotency marker; returns the cleared keys.
    pub fn clear_cache(&self) -> Vec<String> {
        self.store.clear()
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }
}
