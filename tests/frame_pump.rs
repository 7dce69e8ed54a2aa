use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

use videoloop::detect::StubBackend;
use videoloop::ingest::{ImageSequenceSource, SyntheticConfig, SyntheticSource};
use videoloop::sink::ImageSequenceSink;
use videoloop::{
    open_source, CannyParams, DetectTransform, DetectionCapability, EdgeMask, EndReason, FourCC,
    Frame, FramePump, FrameSink, FrameSource, IngestOptions, SinkFlow, SinkInfo, SourceInfo,
    SourceSpec,
};

fn synthetic(url: &str) -> Box<dyn FrameSource> {
    Box::new(SyntheticSource::new(
        SyntheticConfig::from_url(url).expect("synthetic url"),
    ))
}

/// Sink that records what it sees and can ask the pump to stop.
struct RecordingSink {
    info: SinkInfo,
    written: u64,
    stop_after: Option<u64>,
    fail_on: Option<u64>,
    releases: Arc<AtomicUsize>,
}

impl RecordingSink {
    fn new(info: SinkInfo, releases: Arc<AtomicUsize>) -> Self {
        Self {
            info,
            written: 0,
            stop_after: None,
            fail_on: None,
            releases,
        }
    }
}

impl FrameSink for RecordingSink {
    fn describe(&self) -> String {
        "recording".to_string()
    }

    fn write(&mut self, frame: &Frame) -> Result<SinkFlow> {
        if self.fail_on == Some(frame.index()) {
            return Err(anyhow!("disk full"));
        }
        assert_eq!((frame.width(), frame.height()), (self.info.width, self.info.height));
        self.written += 1;
        if self.stop_after.is_some_and(|n| self.written >= n) {
            return Ok(SinkFlow::Stop);
        }
        Ok(SinkFlow::Continue)
    }

    fn release(&mut self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}

/// Source that fails after a fixed number of frames.
struct FlakySource {
    good_frames: u64,
    next: u64,
    releases: Arc<AtomicUsize>,
}

impl FrameSource for FlakySource {
    fn describe(&self) -> String {
        "flaky".to_string()
    }

    fn info(&self) -> SourceInfo {
        SourceInfo::new(4, 4, 10.0)
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if self.next >= self.good_frames {
            return Err(anyhow!("corrupt packet"));
        }
        let frame = Frame::new(RgbImage::new(4, 4), self.next);
        self.next += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stats(&self) -> videoloop::ingest::SourceStats {
        videoloop::ingest::SourceStats {
            frames_read: self.next,
            source: self.describe(),
        }
    }
}

#[test]
fn counts_and_writes_every_frame() {
    let source = synthetic("stub://gradient?frames=12&width=16&height=8&fps=24");
    let info = SinkInfo::from_source(&source.info(), FourCC::DIVX);
    let releases = Arc::new(AtomicUsize::new(0));
    let sink = RecordingSink::new(info, Arc::clone(&releases));

    let started = Instant::now();
    let summary = FramePump::new(source)
        .with_sink(Box::new(sink))
        .run()
        .expect("run");
    let wall = started.elapsed();

    assert_eq!(summary.frames, 12);
    assert_eq!(summary.frames_written, 12);
    assert_eq!(summary.end, EndReason::Exhausted);
    assert!(summary.elapsed <= wall);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_source_reports_zero_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = ImageSequenceSource::open(dir.path(), 25.0).expect("open");
    let summary = FramePump::new(Box::new(source)).run().expect("run");
    assert_eq!(summary.frames, 0);
    assert_eq!(summary.end, EndReason::Exhausted);
}

#[test]
fn stop_from_sink_ends_endless_source_after_one_frame() {
    let source = synthetic("stub://uniform?width=8&height=8");
    let info = SinkInfo::from_source(&source.info(), FourCC::DIVX);
    let releases = Arc::new(AtomicUsize::new(0));
    let mut sink = RecordingSink::new(info, Arc::clone(&releases));
    sink.stop_after = Some(1);

    let summary = FramePump::new(source)
        .with_sink(Box::new(sink))
        .run()
        .expect("run");
    assert_eq!(summary.frames, 1);
    assert_eq!(summary.end, EndReason::UserExit);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn read_failure_ends_the_loop_without_error() {
    let releases = Arc::new(AtomicUsize::new(0));
    let source = FlakySource {
        good_frames: 3,
        next: 0,
        releases: Arc::clone(&releases),
    };
    let summary = FramePump::new(Box::new(source)).run().expect("run");
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.end, EndReason::ReadFailed);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn sink_failure_propagates_and_still_releases() {
    let source_releases = Arc::new(AtomicUsize::new(0));
    let sink_releases = Arc::new(AtomicUsize::new(0));
    let source = FlakySource {
        good_frames: 10,
        next: 0,
        releases: Arc::clone(&source_releases),
    };
    let info = SinkInfo::from_source(&source.info(), FourCC::DIVX);
    let mut sink = RecordingSink::new(info, Arc::clone(&sink_releases));
    sink.fail_on = Some(2);

    let err = FramePump::new(Box::new(source))
        .with_sink(Box::new(sink))
        .run()
        .expect_err("sink failure must propagate");
    assert!(err.to_string().contains("disk full"));
    assert_eq!(source_releases.load(Ordering::SeqCst), 1);
    assert_eq!(sink_releases.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_flag_interrupts_run() {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let summary = FramePump::new(synthetic("stub://uniform?width=4&height=4"))
        .with_stop_flag(stop)
        .run_observed(|frames| {
            if frames == 5 {
                flag.store(true, Ordering::SeqCst);
            }
        })
        .expect("run");
    assert_eq!(summary.frames, 5);
    assert_eq!(summary.end, EndReason::Interrupted);
}

#[test]
fn detector_counts_positive_frames() {
    // Blink alternates black and white frames; the stub detector fires on white.
    let backend = Arc::new(Mutex::new(StubBackend::new()));
    let detector = DetectTransform::new(backend, DetectionCapability::Pedestrian);
    let summary = FramePump::new(synthetic("stub://blink?frames=9&width=8&height=8"))
        .with_transform(Box::new(detector))
        .run()
        .expect("run");
    assert_eq!(summary.frames, 9);
    assert_eq!(summary.frames_with_detection, Some(4));
    assert_eq!(summary.subject, Some("people"));
    assert!(summary.frames_with_detection.unwrap() <= summary.frames);
}

#[test]
fn edge_mask_run_writes_black_frames_for_uniform_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("edges");
    let source = synthetic("stub://uniform?frames=3&width=12&height=10&color=3080c0");
    let info = SinkInfo::from_source(&source.info(), FourCC::DIVX);
    let sink = ImageSequenceSink::create(&out, info).expect("sink");
    let edges = EdgeMask::new(CannyParams::default()).expect("edges");

    let summary = FramePump::new(source)
        .with_transform(Box::new(edges))
        .with_sink(Box::new(sink))
        .run()
        .expect("run");
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.frames_with_detection, None);

    let written = image::open(out.join("frame_000001.png"))
        .expect("frame")
        .to_rgb8();
    assert!(written.pixels().all(|p| *p == Rgb([0, 0, 0])));
}

#[test]
fn image_sequence_output_matches_source_geometry_and_rate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("copy");
    let spec = SourceSpec::parse("stub://gradient?frames=5&width=20&height=14&fps=12").unwrap();
    let source = open_source(&spec, &IngestOptions::default()).expect("source");
    let source_info = source.info();
    let sink = ImageSequenceSink::create(&out, SinkInfo::from_source(&source_info, FourCC::DIVX))
        .expect("sink");

    let summary = FramePump::new(source)
        .with_sink(Box::new(sink))
        .run()
        .expect("run");
    assert_eq!(summary.frames_written, 5);

    let copy_spec = SourceSpec::parse(out.to_str().unwrap()).unwrap();
    let mut copy = open_source(&copy_spec, &IngestOptions::default()).expect("reopen");
    assert_eq!(copy.info(), source_info);
    let mut frames = 0;
    while let Some(frame) = copy.read().expect("read") {
        assert_eq!((frame.width(), frame.height()), (20, 14));
        frames += 1;
    }
    assert_eq!(frames, 5);
}

#[test]
fn rewriting_an_image_sequence_reads_back_only_the_new_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("reused");

    for frames in [5u64, 2] {
        let url = format!("stub://gradient?frames={frames}&width=10&height=6&fps=15");
        let source = synthetic(&url);
        let info = SinkInfo::from_source(&source.info(), FourCC::DIVX);
        let sink = ImageSequenceSink::create(&out, info).expect("sink");
        let summary = FramePump::new(source)
            .with_sink(Box::new(sink))
            .run()
            .expect("run");
        assert_eq!(summary.frames_written, frames);
    }

    let mut copy = ImageSequenceSource::open(&out, 25.0).expect("reopen");
    assert_eq!(copy.info().fps, 15.0);
    let mut frames = 0;
    while copy.read().expect("read").is_some() {
        frames += 1;
    }
    assert_eq!(frames, 2);
}
