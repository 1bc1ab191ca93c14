use shared::metrics_defs::{MetricDef, MetricType};

pub const EVENTS_RECEIVED: MetricDef = MetricDef {
    name: "events.received",
    metric_type: MetricType::Counter,
    description: "Push deliveries received. Tagged with pipeline.",
};

pub const EVENTS_FILTERED: MetricDef = MetricDef {
    name: "events.filtered",
    metric_type: MetricType::Counter,
    description: "Deliveries ignored because the file_type tag belongs to another pipeline. Tagged with pipeline.",
};

pub const EVENTS_FAILED: MetricDef = MetricDef {
    name: "events.failed",
    metric_type: MetricType::Counter,
    description: "Invocations that returned an error and will be redelivered. Tagged with pipeline, kind.",
};

pub const SOURCES_EMPTY: MetricDef = MetricDef {
    name: "sources.empty",
    metric_type: MetricType::Counter,
    description: "Record sources that parsed to an empty array and were not loaded. Tagged with pipeline.",
};

pub const LOAD_DURATION: MetricDef = MetricDef {
    name: "load.duration",
    metric_type: MetricType::Histogram,
    description: "Time from load job submission to terminal state in seconds. Tagged with table.",
};

pub const LOAD_ROWS: MetricDef = MetricDef {
    name: "load.rows",
    metric_type: MetricType::Histogram,
    description: "Rows written by a successful load job, when known. Tagged with table.",
};

pub const LOAD_FAILURES: MetricDef = MetricDef {
    name: "load.failures",
    metric_type: MetricType::Counter,
    description: "Load jobs that failed or could not be submitted. Tagged with table.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    EVENTS_RECEIVED,
    EVENTS_FILTERED,
    EVENTS_FAILED,
    SOURCES_EMPTY,
    LOAD_DURATION,
    LOAD_ROWS,
    LOAD_FAILURES,
];
