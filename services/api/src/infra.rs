use chrono::NaiveDate;
use floorplan::alerts::{AlertGenerator, AlertInbox};
use floorplan::clock::Clock;
use floorplan::dashboard::DashboardAggregator;
use floorplan::ledger::FloorPlanLedger;
use floorplan::store::InMemoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Ledger, alert job, inbox, and dashboard sharing one in-memory store.
pub(crate) struct FloorPlanEngine<C> {
    pub(crate) ledger: FloorPlanLedger<InMemoryStore, C>,
    pub(crate) generator: AlertGenerator<InMemoryStore, C, InMemoryStore>,
    pub(crate) inbox: AlertInbox<InMemoryStore>,
    pub(crate) dashboard: Arc<DashboardAggregator<InMemoryStore, C, InMemoryStore>>,
}

impl<C> FloorPlanEngine<C>
where
    C: Clock + 'static,
{
    pub(crate) fn in_memory(clock: Arc<C>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let ledger = FloorPlanLedger::new(Arc::clone(&store), clock);
        let inbox = AlertInbox::new(Arc::clone(&store));
        Self {
            generator: AlertGenerator::new(ledger.clone(), Arc::clone(&store)),
            dashboard: Arc::new(DashboardAggregator::new(ledger.clone(), inbox.clone())),
            inbox,
            ledger,
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
