use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use tracing::warn;


lazy_static! {
    pub static ref DELETED_ITEMS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("deleted_items", "Keys acknowledged as deleted by batch writes"),
        &["table"]
    )
    .expect("metric can not be created");

    pub static ref SCANNED_PAGES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("scanned_pages", "Segment scan pages fetched"),
        &["table"]
    )
    .expect("metric can not be created");

    pub static ref UNPROCESSED_RETRIES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("unprocessed_retries", "Batch resubmissions caused by unprocessed items"),
        &["table"]
    )
    .expect("metric can not be created");

    pub static ref TABLE_FAILURES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("table_failures", "Tables whose truncation failed"),
        &["table", "mode"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some("truncator".to_string()), None).expect("registry can be created");
}

static REGISTER_ONCE: Once = Once::new();

/// Register every truncator collector on `registry`; collectors already
/// present are left as they are.
fn register_custom_metrics(registry: &Registry) {
    let collectors = [
        DELETED_ITEMS_METRIC.clone(),
        SCANNED_PAGES_METRIC.clone(),
        UNPROCESSED_RETRIES_METRIC.clone(),
        TABLE_FAILURES_METRIC.clone(),
    ];
    for collector in collectors {
        match registry.register(Box::new(collector)) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => warn!("collector can not be registered: {}", e),
        }
    }
}

/// Text exposition of every truncator metric.
pub fn render_metrics() -> String {
    REGISTER_ONCE.call_once(|| register_custom_metrics(&REGISTRY));

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("could not encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        warn!("metrics could not be from_utf8'd: {}", e);
        String::new()
    })
}
