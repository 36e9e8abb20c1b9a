use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

/// Buffered telemetry for one process. Points accumulate and go out in one
/// `publish` batch; dimensions are shared by every point in the batch.
#[async_trait]
pub trait MetricsSink: Send + Sync + 'static {
    fn record_point(&self, name: &str, value: f64, unit: &str);
    fn record_dimension(&self, key: &str, value: &str);
    /// Returns whether the batch was accepted by the backend.
    async fn publish(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Default)]
struct Buffer {
    points: Vec<MetricPoint>,
    dimensions: Vec<(String, String)>,
}

/// In-memory [`MetricsSink`]: repeated points under the same name sum up,
/// dimensions are recorded once. `publish` logs the batch and clears it.
/// Doubles as the test sink.
#[derive(Debug, Default)]
pub struct BufferingMetricsSink {
    buffer: Mutex<Buffer>,
}

impl BufferingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<MetricPoint> {
        self.buffer.lock().map(|b| b.points.clone()).unwrap_or_default()
    }

    pub fn dimensions(&self) -> Vec<(String, String)> {
        self.buffer.lock().map(|b| b.dimensions.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MetricsSink for BufferingMetricsSink {
    fn record_point(&self, name: &str, value: f64, unit: &str) {
        let Ok(mut buffer) = self.buffer.lock() else { return };
        if let Some(existing) = buffer.points.iter_mut().find(|p| p.name == name) {
            existing.value += value;
        } else {
            buffer.points.push(MetricPoint {
                name: name.to_string(),
                value,
                unit: unit.to_string(),
            });
        }
    }

    fn record_dimension(&self, key: &str, value: &str) {
        let Ok(mut buffer) = self.buffer.lock() else { return };
        if !buffer.dimensions.iter().any(|(k, _)| k == key) {
            buffer.dimensions.push((key.to_string(), value.to_string()));
        }
    }

    async fn publish(&self) -> bool {
        let Ok(mut buffer) = self.buffer.lock() else { return false };
        for point in &buffer.points {
            info!(
                metric = %point.name,
                value = point.value,
                unit = %point.unit,
                dimensions = ?buffer.dimensions,
                "metric"
            );
        }
        buffer.points.clear();
        buffer.dimensions.clear();
        true
    }
}
