use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Process-wide Prometheus instruments, rendered at `GET /metrics`.
#[derive(Clone)]
pub struct MetricsService {
    registry: Registry,
    http_requests: IntCounterVec,
    request_duration: HistogramVec,
    generations: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests served"),
            &["method", "status"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0]),
            &["method"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let generations = IntCounterVec::new(
            Opts::new("outfit_generations_total", "Outfit generation attempts by outcome"),
            &["provider", "outcome"],
        )?;
        registry.register(Box::new(generations.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            request_duration,
            generations,
        })
    }

    /// `status` is bucketed to its class (`2xx`, `4xx`, ...).
    pub fn record_request(&self, method: &str, status: u16) {
        let class = format!("{}xx", status / 100);
        self.http_requests.with_label_values(&[method, &class]).inc();
    }

    pub fn record_generation(&self, provider: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.generations.with_label_values(&[provider, outcome]).inc();
    }

    pub fn start_timer(&self, method: &str) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
            method: method.to_string(),
            histogram: self.request_duration.clone(),
        }
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Observes the elapsed time into the latency histogram when dropped.
pub struct RequestTimer {
    start: Instant,
    method: String,
    histogram: HistogramVec,
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.histogram
            .with_label_values(&[&self.method])
            .observe(self.start.elapsed().as_secs_f64());
    }
}
