use std::collections::VecDeque;
use std::convert::Infallible;
use std::fs;
use std::thread;

use ppe_compliance_rs::integration::{IterSource, ReplayRecording};
use ppe_compliance_rs::{
    ComplianceObserver, CompliancePipeline, ComplianceState, Config, Detection, DetectionSource,
    ErrorPolicy, Frame, FrameCrop, FrameReport, RawObservations, SimulatedObserver, TrackerConfig,
};

/// Serves one scripted detection list per frame, nothing after the script ends.
struct ScriptedDetector(VecDeque<Vec<Detection>>);

impl DetectionSource for ScriptedDetector {
    type Error = Infallible;

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        Ok(self.0.pop_front().unwrap_or_default())
    }
}

/// Answers every item with the next scripted value, UNKNOWN after the script ends.
struct ScriptedObserver(VecDeque<&'static str>);

impl ComplianceObserver for ScriptedObserver {
    type Error = Infallible;

    fn observe(&mut self, _crop: &FrameCrop<'_>, items: &[String]) -> Result<RawObservations, Self::Error> {
        let value = self.0.pop_front().unwrap_or("UNKNOWN");
        Ok(items.iter().map(|item| (item.clone(), value.to_string())).collect())
    }
}

fn run_to_end<D: DetectionSource, O: ComplianceObserver>(
    pipeline: &mut CompliancePipeline<D, O>,
    frames: u64,
) -> Vec<FrameReport> {
    let mut source = IterSource((0..frames).map(|i| Frame::blank(i, 640, 480)));
    let mut reports = Vec::new();
    pipeline
        .run(&mut source, ErrorPolicy::Abort, |report| {
            reports.push(report.clone());
            Ok(())
        })
        .unwrap();
    reports
}

#[test]
fn test_sticky_verdict_follows_track_until_it_leaves() {
    let person = Detection::new(200.0, 100.0, 260.0, 280.0, 0.9);
    let detector = ScriptedDetector(vec![vec![person]; 4].into());
    let observer = ScriptedObserver(["UNKNOWN", "COMPLIANT", "unknown", "NON_COMPLIANT"].into());
    let tracker = TrackerConfig {
        max_age: 2,
        min_hits: 1,
        ..TrackerConfig::default()
    };
    let mut pipeline = CompliancePipeline::new(detector, observer, tracker, ["helmet"]);

    let reports = run_to_end(&mut pipeline, 8);
    assert_eq!(reports.len(), 8);

    use ComplianceState::*;
    let expected = [
        Some(Unknown),
        Some(Compliant),
        Some(Compliant),
        Some(NonCompliant),
        // Coasting on the motion model, still reported.
        Some(NonCompliant),
        Some(NonCompliant),
        // Third miss exceeds max_age.
        None,
        None,
    ];
    for (report, expected) in reports.iter().zip(expected) {
        let helmet = report
            .compliance_status
            .first()
            .and_then(|record| record.get("helmet"));
        assert_eq!(helmet, expected, "frame {}", report.frame_number);
        assert_eq!(report.active_tracks, usize::from(expected.is_some()));
    }
    assert!(pipeline.aggregator().is_empty());
}

#[test]
fn test_replayed_stream_from_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config.yaml"),
        r#"
video_stream: gate.jsonl
frame_size: [640, 480]
person_detector:
  confidence_threshold: 0.5
tracker:
  max_age: 3
  min_hits: 1
  iou_threshold: 0.3
run_detection_every_n_frames: 2
ppe_items: [helmet, vest]
"#,
    )
    .unwrap();
    let lines: Vec<String> = (0..10)
        .map(|i| {
            let dx = 3 * i;
            format!(
                "[[{}, 100, {}, 300, 0.9], [500, 50, 540, 120, 0.2]]",
                100 + dx,
                170 + dx
            )
        })
        .collect();
    fs::write(dir.path().join("gate.jsonl"), lines.join("\n")).unwrap();

    let config = Config::load(dir.path().join("config.yaml")).unwrap();
    let (mut frames, detector) = ReplayRecording::open(&config.video_stream)
        .unwrap()
        .into_parts(config.frame_size[0], config.frame_size[1]);
    let observer = SimulatedObserver::with_view_dependent_items(1, config.view_dependent_items.clone());
    let mut pipeline = CompliancePipeline::from_config(detector, observer, &config);

    let mut reports = Vec::new();
    let summary = pipeline
        .run(&mut frames, ErrorPolicy::Abort, |report| {
            reports.push(serde_json::to_value(report)?);
            Ok(())
        })
        .unwrap();

    assert_eq!(summary.frames_processed, 10);
    let numbers: Vec<u64> = reports
        .iter()
        .map(|r| r["frame_number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, (0..10).collect::<Vec<_>>());

    // Detections land on even frames only; the walker coasts in between and
    // the low-confidence box never becomes a track.
    for report in &reports {
        assert_eq!(report["active_tracks"], 1);
    }
    let record = &reports[9]["compliance_status"][0];
    assert_eq!(record["track_id"], 1);
    let status = record["ppe_status"].as_object().unwrap();
    assert_eq!(status.keys().collect::<Vec<_>>(), vec!["helmet", "vest"]);
}

#[test]
fn test_streams_are_isolated() {
    let handles: Vec<_> = (0..3)
        .map(|stream| {
            thread::spawn(move || {
                let offset = 40.0 * stream as f32;
                let dets = vec![
                    vec![
                        Detection::new(10.0 + offset, 10.0, 60.0 + offset, 120.0, 0.9),
                        Detection::new(300.0, 200.0, 350.0, 330.0, 0.9),
                    ];
                    5
                ];
                let tracker = TrackerConfig {
                    min_hits: 1,
                    ..TrackerConfig::default()
                };
                let mut pipeline = CompliancePipeline::new(
                    ScriptedDetector(dets.into()),
                    SimulatedObserver::new(stream),
                    tracker,
                    ["helmet"],
                );
                let reports = run_to_end(&mut pipeline, 5);
                reports
                    .last()
                    .map(|r| r.tracks.iter().map(|t| t.track_id).collect::<Vec<_>>())
                    .unwrap_or_default()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![1, 2]);
    }
}
