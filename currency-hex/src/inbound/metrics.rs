//! Controller-level metrics for the convert endpoint.
//!
//! Instruments come from the global meter provider; without one installed
//! they are no-ops.

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

pub struct ConvertMetrics {
    timer: Histogram<f64>,
    failures: Counter<u64>,
    attributes: [KeyValue; 1],
}

impl ConvertMetrics {
    pub fn new() -> Self {
        let meter = global::meter("currency-hex");
        Self {
            timer: meter
                .f64_histogram("controller.convert.timer")
                .with_description("Time spent serving convert requests")
                .with_unit("s")
                .build(),
            failures: meter
                .u64_counter("controller.convert.fail.counter")
                .with_description("Convert requests that did not succeed")
                .build(),
            attributes: [KeyValue::new("endpoint", "convert")],
        }
    }

    pub fn record(&self, elapsed: Duration, succeeded: bool) {
        self.timer.record(elapsed.as_secs_f64(), &self.attributes);
        if !succeeded {
            self.failures.add(1, &self.attributes);
        }
    }
}

impl Default for ConvertMetrics {
    fn default() -> Self {
        Self::new()
    }
}
