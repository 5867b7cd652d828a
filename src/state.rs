use std::sync::Arc;

use crate::backend::CollectionBackend;
use crate::engine::workflow::AssignmentWorkflow;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub backend: Arc<dyn CollectionBackend>,
    pub workflow: AssignmentWorkflow,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(backend: Arc<dyn CollectionBackend>) -> Self {
        let metrics = Metrics::new();
        let workflow = AssignmentWorkflow::new(backend.clone(), metrics.clone());

        Self {
            backend,
            workflow,
            metrics,
        }
    }
}
