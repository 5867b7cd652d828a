use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::models::collector::Collector;
use crate::models::request::PickupRequest;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Availability {
    pub available: Vec<Collector>,
    pub busy: Vec<Collector>,
}

impl Availability {
    pub fn is_available(&self, collector_id: Uuid) -> bool {
        self.available.iter().any(|collector| collector.id == collector_id)
    }

    pub fn is_busy(&self, collector_id: Uuid) -> bool {
        self.busy.iter().any(|collector| collector.id == collector_id)
    }
}

/// Collectors referenced by at least one PENDING or IN_PROGRESS request.
pub fn busy_collector_ids(requests: &[PickupRequest]) -> HashSet<Uuid> {
    requests
        .iter()
        .filter(|request| request.assignment_status.is_open())
        .filter_map(|request| request.assigned_collector_id)
        .collect()
}

/// Splits the roster into available and busy collectors, keeping roster
/// order within each side.
pub fn resolve_availability(requests: &[PickupRequest], collectors: &[Collector]) -> Availability {
    let busy_ids = busy_collector_ids(requests);

    let (busy, available): (Vec<Collector>, Vec<Collector>) = collectors
        .iter()
        .cloned()
        .partition(|collector| busy_ids.contains(&collector.id));

    Availability { available, busy }
}

/// Open assignments per collector.
pub fn current_workload(requests: &[PickupRequest]) -> HashMap<Uuid, usize> {
    let mut workload = HashMap::new();
    for request in requests.iter().filter(|r| r.assignment_status.is_open()) {
        if let Some(collector_id) = request.assigned_collector_id {
            *workload.entry(collector_id).or_insert(0) += 1;
        }
    }
    workload
}
