use crate::config::OdbConfig;
use crate::core::Result;
use crate::events::{EventFilter, EventService, Subscription};
use crate::repo::{ObservationRepo, ProgramRepo, TargetRepo};
use crate::storage::Database;
use crate::transaction::AtomicCell;
use std::sync::Arc;
use tracing::{Level, event};

/// In-memory observation database
///
/// Owns the committed snapshot, the event service and one repository per
/// entity kind. Cloning is cheap and every clone shares the same state, so
/// an `Odb` can be handed to many threads or tasks.
#[derive(Debug, Clone)]
pub struct Odb {
    cell: Arc<AtomicCell>,
    events: Arc<EventService>,
    config: Arc<OdbConfig>,
    programs: ProgramRepo,
    observations: ObservationRepo,
    targets: TargetRepo,
}

impl Default for Odb {
    fn default() -> Self {
        Self::new()
    }
}

impl Odb {
    /// Create an empty database with the default configuration
    pub fn new() -> Self {
        Self::with_config(OdbConfig::default())
    }

    /// Create an empty database with a custom configuration
    pub fn with_config(config: OdbConfig) -> Self {
        event!(
            Level::DEBUG,
            max_cas_retries = config.max_cas_retries,
            default_page_size = ?config.default_page_size,
            suggested_id_policy = ?config.suggested_id_policy,
            "creating database"
        );
        let cell = Arc::new(AtomicCell::new(Database::new(), config.max_cas_retries));
        let events = Arc::new(EventService::new());
        let config = Arc::new(config);
        Self {
            programs: ProgramRepo::new(Arc::clone(&cell), Arc::clone(&events), Arc::clone(&config)),
            observations: ObservationRepo::new(
                Arc::clone(&cell),
                Arc::clone(&events),
                Arc::clone(&config),
            ),
            targets: TargetRepo::new(Arc::clone(&cell), Arc::clone(&events), Arc::clone(&config)),
            cell,
            events,
            config,
        }
    }

    pub fn programs(&self) -> &ProgramRepo {
        &self.programs
    }

    pub fn observations(&self) -> &ObservationRepo {
        &self.observations
    }

    pub fn targets(&self) -> &TargetRepo {
        &self.targets
    }

    /// Stream of events committed from now on that pass `filter`
    pub fn subscribe(&self, filter: EventFilter) -> Result<Subscription> {
        self.events.subscribe(filter)
    }

    /// The event service, for subscriber and event-id bookkeeping
    pub fn events(&self) -> &EventService {
        &self.events
    }

    /// The latest committed snapshot
    ///
    /// Long computations should work from a snapshot and write their results
    /// back through a repository operation.
    pub fn snapshot(&self) -> Result<Arc<Database>> {
        self.cell.get()
    }

    pub fn config(&self) -> &OdbConfig {
        &self.config
    }
}
