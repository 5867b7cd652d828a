use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub workflow_actions_total: IntCounterVec,
    pub workflow_latency_seconds: HistogramVec,
    pub lifecycle_corrections_total: IntCounter,
    pub busy_collectors: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let workflow_actions_total = IntCounterVec::new(
            Opts::new(
                "workflow_actions_total",
                "Claim, release, complete and edit actions by outcome",
            ),
            &["action", "outcome"],
        )
        .expect("valid workflow_actions_total metric");

        let workflow_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "workflow_latency_seconds",
                "Latency of workflow actions including the backend round trip",
            ),
            &["action"],
        )
        .expect("valid workflow_latency_seconds metric");

        let lifecycle_corrections_total = IntCounter::new(
            "lifecycle_corrections_total",
            "Status/assignment pairs repaired to their fallback value",
        )
        .expect("valid lifecycle_corrections_total metric");

        let busy_collectors = IntGauge::new(
            "busy_collectors",
            "Collectors holding an open assignment at the last availability check",
        )
        .expect("valid busy_collectors metric");

        registry
            .register(Box::new(workflow_actions_total.clone()))
            .expect("register workflow_actions_total");
        registry
            .register(Box::new(workflow_latency_seconds.clone()))
            .expect("register workflow_latency_seconds");
        registry
            .register(Box::new(lifecycle_corrections_total.clone()))
            .expect("register lifecycle_corrections_total");
        registry
            .register(Box::new(busy_collectors.clone()))
            .expect("register busy_collectors");

        Self {
            registry,
            workflow_actions_total,
            workflow_latency_seconds,
            lifecycle_corrections_total,
            busy_collectors,
        }
    }

    pub fn record_action(&self, action: &str, outcome: &str, elapsed_seconds: f64) {
        self.workflow_actions_total
            .with_label_values(&[action, outcome])
            .inc();
        self.workflow_latency_seconds
            .with_label_values(&[action])
            .observe(elapsed_seconds);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
