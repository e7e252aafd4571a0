//! CloudSink - bounded in-memory point cloud
//!
//! Keeps the newest `max_points` points (oldest evicted first) and the latest
//! position of every marker id. Readers share the cloud through [`CloudView`].

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use contracts::{ContractError, DataSink, Marker, MarkerFrame, PointRecord, SinkRecord};
use parking_lot::RwLock;
use tracing::{debug, instrument, trace};

/// Bounded point store
#[derive(Debug)]
pub struct PointCloud {
    points: VecDeque<PointRecord>,
    markers: BTreeMap<i32, Marker>,
    max_points: usize,
    evicted: u64,
}

impl PointCloud {
    pub fn new(max_points: usize) -> Self {
        let max_points = max_points.max(1);
        Self {
            points: VecDeque::with_capacity(max_points.min(4096)),
            markers: BTreeMap::new(),
            max_points,
            evicted: 0,
        }
    }

    /// Append a point, evicting the oldest while over capacity
    pub fn push(&mut self, record: PointRecord) {
        self.points.push_back(record);
        while self.points.len() > self.max_points {
            self.points.pop_front();
            self.evicted += 1;
        }
    }

    /// Replace the stored position of every marker in `frame`
    pub fn update_markers(&mut self, frame: &MarkerFrame) {
        for marker in &frame.markers {
            self.markers.insert(marker.id, *marker);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Points dropped to honor the cap
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Oldest first
    pub fn points(&self) -> impl Iterator<Item = &PointRecord> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&PointRecord> {
        self.points.back()
    }

    /// Markers ordered by id
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }
}

/// Shared read handle to a [`PointCloud`]
#[derive(Debug, Clone)]
pub struct CloudView {
    inner: Arc<RwLock<PointCloud>>,
}

impl CloudView {
    pub fn new(max_points: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PointCloud::new(max_points))),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.inner.read().evicted()
    }

    /// Copy of all retained points, oldest first
    pub fn points(&self) -> Vec<PointRecord> {
        self.inner.read().points().copied().collect()
    }

    pub fn latest(&self) -> Option<PointRecord> {
        self.inner.read().latest().copied()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.inner.read().markers().copied().collect()
    }

    /// Run `f` under the read lock
    pub fn with<R>(&self, f: impl FnOnce(&PointCloud) -> R) -> R {
        f(&self.inner.read())
    }
}

/// Sink that stores records in a [`PointCloud`]
pub struct CloudSink {
    name: String,
    cloud: CloudView,
}

impl CloudSink {
    pub fn new(name: impl Into<String>, max_points: usize) -> Self {
        Self {
            name: name.into(),
            cloud: CloudView::new(max_points),
        }
    }

    /// `max_points` param overrides `default_max_points`
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        default_max_points: usize,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let max_points = match params.get("max_points") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                ContractError::sink_connection(&name, format!("invalid max_points '{raw}': {e}"))
            })?,
            None => default_max_points,
        };
        Ok(Self::new(name, max_points))
    }

    pub fn view(&self) -> CloudView {
        self.cloud.clone()
    }
}

impl DataSink for CloudSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "trace", name = "cloud_sink_write", skip(self, record), fields(sink = %self.name))]
    async fn write(&mut self, record: &SinkRecord) -> Result<(), ContractError> {
        let mut cloud = self.cloud.inner.write();
        match record {
            SinkRecord::Point(point) => {
                cloud.push(*point);
                trace!(seq = point.seq, len = cloud.len(), "point stored");
            }
            SinkRecord::Markers(frame) => cloud.update_markers(frame),
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        let cloud = self.cloud.inner.read();
        debug!(
            sink = %self.name,
            points = cloud.len(),
            evicted = cloud.evicted(),
            "CloudSink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::point_record;
    use contracts::Vector3;

    fn point(seq: u64) -> PointRecord {
        match point_record(seq) {
            SinkRecord::Point(p) => p,
            SinkRecord::Markers(_) => unreachable!(),
        }
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut cloud = PointCloud::new(3);
        for seq in 1..=5 {
            cloud.push(point(seq));
        }
        let seqs: Vec<u64> = cloud.points().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
        assert_eq!(cloud.evicted(), 2);
        assert_eq!(cloud.latest().map(|p| p.seq), Some(5));
    }

    #[test]
    fn test_markers_keep_latest_position() {
        let mut cloud = PointCloud::new(10);
        let frame = |x: f32| MarkerFrame {
            timestamp: 1.0,
            markers: vec![
                Marker {
                    id: 2,
                    position: Vector3::new(x, 0.0, 0.0),
                },
                Marker {
                    id: 1,
                    position: Vector3::new(0.0, 0.0, 1.0),
                },
            ],
        };
        cloud.update_markers(&frame(0.5));
        cloud.update_markers(&frame(0.7));

        let markers: Vec<&Marker> = cloud.markers().collect();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].id, 1);
        assert_eq!(markers[1].position.x, 0.7);
    }

    #[tokio::test]
    async fn test_cloud_sink_shares_view() {
        let mut sink = CloudSink::new("cloud", 2);
        let view = sink.view();

        for seq in 1..=3 {
            sink.write(&point_record(seq)).await.unwrap();
        }
        assert_eq!(view.len(), 2);
        assert_eq!(view.evicted(), 1);
        assert_eq!(view.points()[0].seq, 2);
    }

    #[test]
    fn test_from_params() {
        let mut params = HashMap::new();
        let sink = CloudSink::from_params("c", &params, 5000).unwrap();
        assert_eq!(sink.view().with(|c| c.max_points()), 5000);

        params.insert("max_points".to_string(), "12".to_string());
        let sink = CloudSink::from_params("c", &params, 5000).unwrap();
        assert_eq!(sink.view().with(|c| c.max_points()), 12);

        params.insert("max_points".to_string(), "lots".to_string());
        assert!(CloudSink::from_params("c", &params, 5000).is_err());
    }
}
