//! Metrics definitions for the reference service.

use shared::metrics_defs::{MetricDef, MetricType};

pub const JOB_RUNS: MetricDef = MetricDef {
    name: "reference.job.runs",
    metric_type: MetricType::Counter,
    description: "Reference load job runs. Tagged with outcome: success, upstream_error or load_error.",
};

pub const FETCH_DURATION: MetricDef = MetricDef {
    name: "reference.fetch.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch the reference list from the upstream endpoint in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[JOB_RUNS, FETCH_DURATION];
