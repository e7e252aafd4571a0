//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端测试：解码 → 最新样本槽 → 融合 → 分发 → 点云
//! - UDP 回环测试

#[cfg(test)]
mod contract_tests {
    use contracts::{
        FusedPoint, PointRecord, PointSource, RejectionReason, Shade, SinkRecord, StationBlueprint,
        Vector3,
    };

    #[test]
    fn test_default_blueprint_is_valid() {
        let blueprint = StationBlueprint::default();
        assert!(config_loader::ConfigLoader::validate(&blueprint).is_ok());
    }

    #[test]
    fn test_demo_station_config_loads() {
        let toml = include_str!("../../../demos/station.toml");
        let blueprint =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(blueprint.sinks.len(), 3);
        assert_eq!(blueprint.receiver.trigger_addr, None);
        assert_eq!(blueprint.fusion.max_points, 5000);
    }

    #[test]
    fn test_sink_record_wire_shape() {
        let record = SinkRecord::Point(PointRecord {
            seq: 9,
            timestamp: 12.5,
            point: FusedPoint {
                position: Vector3::new(-0.0, -0.0, 1.0),
                distance_meters: 1.0,
                shade: Shade {
                    t: 0.2,
                    intensity: 0.46,
                },
                source: PointSource::Derived,
            },
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "point");
        assert_eq!(json["data"]["seq"], 9);
        assert_eq!(json["data"]["point"]["source"], "derived");
    }

    #[test]
    fn test_rejection_labels_are_stable() {
        let labels: Vec<_> = RejectionReason::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            labels,
            vec!["unready", "incomplete", "misaligned", "weak_signal", "distance_jump"]
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::net::UdpSocket;
    use std::time::Duration;

    use contracts::{
        LatestSlot, MarkerFrame, PointRecord, RawDatagram, Sample, SinkConfig, SinkRecord,
        SinkType,
    };
    use dispatcher::{create_dispatcher, Dispatcher};
    use fusion_engine::{FusionConfig, FusionPipeline, PointSource, RejectionReason, ShadingConfig};
    use ingestion::{handle_datagram, IngestionPipeline, ReceiverStats, UdpDatagramSource};
    use nalgebra::{UnitQuaternion, Vector3};
    use observability::FusionMetricsAggregator;

    fn nested(t: f64, distance_cm: f32, strength: i32, q: UnitQuaternion<f32>) -> String {
        format!(
            r#"{{"tfluna":{{"timestamp":{t},"distance_cm":{distance_cm},"strength":{strength},"temperature_c":31.5}},"bno055":{{"timestamp":{t},"qw":{},"qx":{},"qy":{},"qz":{}}}}}"#,
            q.w, q.i, q.j, q.k
        )
    }

    fn sink(name: &str, sink_type: SinkType, params: &[(&str, &str)]) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type,
            queue_capacity: 100,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    /// Slots + stats as the ingestion side owns them
    struct Receiver {
        samples: LatestSlot<Sample>,
        markers: LatestSlot<MarkerFrame>,
        stats: ReceiverStats,
    }

    impl Receiver {
        fn new() -> Self {
            Self {
                samples: LatestSlot::new(),
                markers: LatestSlot::new(),
                stats: ReceiverStats::new(),
            }
        }

        fn feed(&self, json: &str) {
            handle_datagram(
                &RawDatagram::new(json.as_bytes().to_vec(), None),
                &self.samples,
                &self.markers,
                &self.stats,
            );
        }
    }

    /// One consumer tick: fuse the fresh sample and dispatch the result
    fn tick(
        pipeline: &mut FusionPipeline,
        receiver: &Receiver,
        dispatcher: &mut Dispatcher,
        next_seq: &mut u64,
        calibrate: bool,
    ) -> Option<Result<PointSource, RejectionReason>> {
        let outcome = pipeline.tick(&receiver.samples, calibrate, dispatcher.is_ready());
        if let Some((_, frame)) = receiver.markers.take_fresh() {
            dispatcher.dispatch(SinkRecord::Markers(frame));
        }
        let fused = outcome.fused?;
        Some(fused.outcome.map(|point| {
            *next_seq += 1;
            dispatcher.dispatch(SinkRecord::Point(PointRecord {
                seq: *next_seq,
                timestamp: fused.timestamp,
                point,
            }));
            point.source
        }))
    }

    /// End-to-end: datagrams -> slot -> pipeline -> dispatcher -> cloud + file
    #[tokio::test]
    async fn test_e2e_decode_to_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("points.jsonl");
        let sinks = vec![
            sink("cloud", SinkType::Cloud, &[]),
            sink("jsonl", SinkType::File, &[("path", file_path.to_str().unwrap())]),
        ];
        let mut dispatcher = create_dispatcher(sinks, 3).await.unwrap();
        let cloud = dispatcher.cloud("cloud").unwrap();

        let receiver = Receiver::new();
        let mut pipeline = FusionPipeline::new(FusionConfig::default(), ShadingConfig::default());
        let mut seq = 0;

        for i in 0..5 {
            let t = 100.0 + i as f64 * 0.02;
            receiver.feed(&nested(t, 150.0, 600, UnitQuaternion::identity()));
            assert_eq!(
                tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false),
                Some(Ok(PointSource::Derived))
            );
            // Nothing new: a sample is fused once
            assert_eq!(
                tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false),
                None
            );
        }

        receiver.feed(r#"{"timestamp":100.2,"markers":[{"id":3,"tvec":[0.5,0.0,1.0]}]}"#);
        assert_eq!(
            tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false),
            None
        );

        let finals = dispatcher.shutdown().await;
        assert!(finals.iter().all(|(_, m)| m.failure_count == 0));

        // Cloud keeps the newest max_points
        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.evicted(), 2);
        let latest = cloud.latest().unwrap();
        assert_eq!(latest.seq, 5);
        assert!((latest.point.position.z - 1.5).abs() < 1e-5);
        assert!(latest.point.position.x.abs() < 1e-5);
        assert_eq!(cloud.markers().len(), 1);

        // File holds every record: 5 points + 1 marker frame
        let content = std::fs::read_to_string(&file_path).unwrap();
        let records: Vec<SinkRecord> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].seq(), Some(1));
        assert!(matches!(records[5], SinkRecord::Markers(_)));
    }

    #[tokio::test]
    async fn test_e2e_rejections_are_not_dispatched() {
        let mut dispatcher = create_dispatcher(vec![sink("cloud", SinkType::Cloud, &[])], 100)
            .await
            .unwrap();
        let cloud = dispatcher.cloud("cloud").unwrap();
        let receiver = Receiver::new();
        let mut pipeline = FusionPipeline::new(FusionConfig::default(), ShadingConfig::default());
        let mut aggregator = FusionMetricsAggregator::new();
        let mut seq = 0;

        let q = UnitQuaternion::identity();
        // Weak signal
        receiver.feed(&nested(1.0, 100.0, 20, q));
        // Misaligned: range and orientation 0.2 s apart
        let misaligned = r#"{"tfluna":{"timestamp":2.0,"distance_cm":100,"strength":500,"temperature_c":30},"bno055":{"timestamp":2.2,"qw":1,"qx":0,"qy":0,"qz":0}}"#;
        // Incomplete: no orientation
        let incomplete = r#"{"tfluna":{"timestamp":3.0,"distance_cm":100,"strength":500,"temperature_c":30}}"#;

        let mut outcomes = Vec::new();
        outcomes.push(tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false));
        receiver.feed(misaligned);
        outcomes.push(tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false));
        receiver.feed(incomplete);
        outcomes.push(tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false));

        assert_eq!(
            outcomes,
            vec![
                Some(Err(RejectionReason::WeakSignal)),
                Some(Err(RejectionReason::Misaligned)),
                Some(Err(RejectionReason::Incomplete)),
            ]
        );
        for outcome in &outcomes {
            if let Some(Err(reason)) = outcome {
                aggregator.update(&Err(*reason));
            }
        }

        dispatcher.shutdown().await;
        assert!(cloud.is_empty());
        assert_eq!(pipeline.stats().rejected_total(), 3);
        assert_eq!(aggregator.summary().total_rejected, 3);
    }

    #[tokio::test]
    async fn test_e2e_overflowing_distance_is_dropped() {
        let mut dispatcher = create_dispatcher(vec![sink("cloud", SinkType::Cloud, &[])], 100)
            .await
            .unwrap();
        let cloud = dispatcher.cloud("cloud").unwrap();
        let receiver = Receiver::new();
        let mut pipeline = FusionPipeline::new(FusionConfig::default(), ShadingConfig::default());
        let mut seq = 0;

        // 1e39 does not fit an f32 and decodes as inf
        receiver.feed(r#"{"tfluna":{"timestamp":1.0,"distance_cm":1e39,"strength":500,"temperature_c":30},"bno055":{"timestamp":1.0,"qw":1,"qx":0,"qy":0,"qz":0}}"#);
        assert_eq!(
            tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false),
            Some(Err(RejectionReason::DistanceJump))
        );
        assert!(pipeline.distance_filter().is_empty());

        for i in 0..3 {
            receiver.feed(&nested(1.1 + i as f64 * 0.1, 100.0, 500, UnitQuaternion::identity()));
            assert_eq!(
                tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false),
                Some(Ok(PointSource::Derived))
            );
        }

        dispatcher.shutdown().await;
        assert_eq!(cloud.len(), 3);
        let point = cloud.latest().unwrap().point;
        assert!((point.position.z - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_e2e_calibration_recenters_direction() {
        let mut dispatcher = create_dispatcher(vec![sink("cloud", SinkType::Cloud, &[])], 100)
            .await
            .unwrap();
        let cloud = dispatcher.cloud("cloud").unwrap();
        let receiver = Receiver::new();
        let config = FusionConfig {
            orientation_smoothing: 1.0,
            ..Default::default()
        };
        let mut pipeline = FusionPipeline::new(config, ShadingConfig::default());
        let mut seq = 0;

        // Sensor mounted pitched 30 degrees
        let mount = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 30f32.to_radians());
        receiver.feed(&nested(1.0, 200.0, 500, mount));

        // Capture + fuse in the same tick
        assert_eq!(
            tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, true),
            Some(Ok(PointSource::Derived))
        );
        assert!(pipeline.calibrator().has_calibration());

        dispatcher.shutdown().await;
        let point = cloud.latest().unwrap().point;
        assert!(point.position.x.abs() < 1e-4);
        assert!(point.position.y.abs() < 1e-4);
        assert!((point.position.z - 2.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_e2e_absolute_position() {
        let mut dispatcher = create_dispatcher(vec![sink("cloud", SinkType::Cloud, &[])], 100)
            .await
            .unwrap();
        let cloud = dispatcher.cloud("cloud").unwrap();
        let receiver = Receiver::new();
        let mut pipeline = FusionPipeline::new(FusionConfig::default(), ShadingConfig::default());
        let mut seq = 0;

        receiver.feed(r#"{"tfluna":{"timestamp":5.0,"distance_cm":100,"strength":500,"temperature_c":30},"bno055":{"timestamp":5.0,"qw":1,"qx":0,"qy":0,"qz":0},"pos_m":[0.3,0.4,0.0]}"#);
        assert_eq!(
            tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false),
            Some(Ok(PointSource::Absolute))
        );

        dispatcher.shutdown().await;
        let point = cloud.latest().unwrap().point;
        // flip_x / flip_y default on
        assert!((point.position.x + 0.3).abs() < 1e-6);
        assert!((point.position.y + 0.4).abs() < 1e-6);
        assert!((point.distance_meters - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_e2e_unready_without_open_sinks() {
        let mut dispatcher = Dispatcher::with_handles(Vec::new());
        let receiver = Receiver::new();
        let mut pipeline = FusionPipeline::new(FusionConfig::default(), ShadingConfig::default());
        let mut seq = 0;

        receiver.feed(&nested(1.0, 100.0, 500, UnitQuaternion::identity()));
        assert_eq!(
            tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false),
            Some(Err(RejectionReason::Unready))
        );
        assert_eq!(seq, 0);
    }

    /// UDP loopback: real socket -> receiver thread -> slots -> pipeline
    #[tokio::test]
    async fn test_udp_loopback() {
        let source = UdpDatagramSource::bind_with(
            "udp",
            "127.0.0.1:0".parse().unwrap(),
            Duration::from_millis(20),
            65507,
        )
        .unwrap();
        let addr = source.local_addr();

        let mut ingestion = IngestionPipeline::new();
        ingestion.register_source(Box::new(source)).unwrap();
        ingestion.start_all();
        assert!(ingestion.any_listening());

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sender_addr = sender.local_addr().unwrap();
        sender.send_to(b"not json", addr).unwrap();
        sender
            .send_to(
                r#"{"timestamp":1.0,"markers":[{"id":1,"tvec":[0,0,1]}]}"#.as_bytes(),
                addr,
            )
            .unwrap();
        sender
            .send_to(nested(1.0, 120.0, 500, UnitQuaternion::identity()).as_bytes(), addr)
            .unwrap();

        let stats = ingestion.stats();
        let mut waited = Duration::ZERO;
        while stats.snapshot().datagrams_received < 3 && waited < Duration::from_secs(2) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += Duration::from_millis(10);
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.datagrams_received, 3);
        assert_eq!(snapshot.malformed, 1);
        assert_eq!(snapshot.marker_frames, 1);
        assert_eq!(snapshot.samples_published, 1);
        assert_eq!(snapshot.last_sender, Some(sender_addr));
        assert!(snapshot.last_seen_age.is_some());

        let mut pipeline = FusionPipeline::new(FusionConfig::default(), ShadingConfig::default());
        let fused = pipeline
            .tick(&ingestion.samples(), false, true)
            .fused
            .unwrap();
        let point = fused.outcome.unwrap();
        assert!((point.distance_meters - 1.2).abs() < 1e-5);
        assert_eq!(ingestion.markers().take_fresh().map(|(_, f)| f.markers.len()), Some(1));

        ingestion.stop_all();
        assert!(!ingestion.any_listening());
    }

    /// Config text -> blueprint -> dispatcher
    #[tokio::test]
    async fn test_config_to_dispatcher() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
[fusion]
max_points = 2

[[sinks]]
name = "cloud"
sink_type = "cloud"

[[sinks]]
name = "archive"
sink_type = "file"
params = {{ base_path = "{}" }}
"#,
            dir.path().display()
        );
        let blueprint =
            config_loader::ConfigLoader::load_from_str(&content, config_loader::ConfigFormat::Toml)
                .unwrap();

        let mut dispatcher = create_dispatcher(blueprint.sinks.clone(), blueprint.fusion.max_points)
            .await
            .unwrap();
        assert_eq!(dispatcher.sink_count(), 2);

        let receiver = Receiver::new();
        let mut pipeline = FusionPipeline::new(blueprint.fusion.clone(), blueprint.shading.clone());
        let mut seq = 0;
        for i in 0..4 {
            receiver.feed(&nested(
                10.0 + i as f64 * 0.01,
                100.0,
                500,
                UnitQuaternion::identity(),
            ));
            tick(&mut pipeline, &receiver, &mut dispatcher, &mut seq, false);
        }

        let cloud = dispatcher.cloud("cloud").unwrap();
        dispatcher.shutdown().await;
        assert_eq!(cloud.len(), 2);

        // Timestamped archive file under base_path
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
