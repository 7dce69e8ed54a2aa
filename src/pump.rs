//! The frame pump: read, transform, write, count.
//!
//! `FramePump` owns exactly one source and at most one sink. Both are
//! released once, either explicitly at the end of `run` or by `Drop` when a
//! transform or sink fault propagates out of the loop.

use anyhow::Result;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ingest::FrameSource;
use crate::sink::{FrameSink, SinkFlow};
use crate::transform::{Identity, Transform};

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The source reported no further frames.
    Exhausted,
    /// The source failed to decode a frame; treated as end of stream.
    ReadFailed,
    /// The sink asked to stop (exit key).
    UserExit,
    /// The stop flag was raised, usually by Ctrl-C.
    Interrupted,
    /// The configured frame limit was reached.
    FrameLimit,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EndReason::Exhausted => "end of stream",
            EndReason::ReadFailed => "read failed",
            EndReason::UserExit => "user exit",
            EndReason::Interrupted => "interrupted",
            EndReason::FrameLimit => "frame limit",
        };
        f.write_str(label)
    }
}

/// Counters reported once the loop terminates.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    /// `Some` only when the transform is a detector.
    pub frames_with_detection: Option<u64>,
    pub frames_written: u64,
    pub elapsed: Duration,
    pub end: EndReason,
    /// Noun used for the detection counter ("people", "motion").
    pub subject: Option<&'static str>,
}

impl RunSummary {
    pub fn log(&self) {
        match (self.frames_with_detection, self.subject) {
            (Some(positive), Some(subject)) => log::info!(
                "{} frames, {} frames with {}",
                self.frames,
                positive,
                subject
            ),
            _ => log::info!("{} frames", self.frames),
        }
        log::info!("Elapse time: {:.2} seconds", self.elapsed.as_secs_f64());
        log::debug!(
            "loop ended ({}), {} frames written",
            self.end,
            self.frames_written
        );
    }
}

pub struct FramePump {
    source: Box<dyn FrameSource>,
    transform: Box<dyn Transform>,
    sink: Option<Box<dyn FrameSink>>,
    stop: Option<Arc<AtomicBool>>,
    max_frames: Option<u64>,
    released: bool,
}

impl FramePump {
    /// A pump that forwards frames unchanged and writes nowhere.
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            transform: Box::new(Identity),
            sink: None,
            stop: None,
            max_frames: None,
            released: false,
        }
    }

    pub fn with_transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn run(self) -> Result<RunSummary> {
        self.run_observed(|_| {})
    }

    /// Run the loop, calling `observe` with the frame count after every frame.
    pub fn run_observed<F>(mut self, mut observe: F) -> Result<RunSummary>
    where
        F: FnMut(u64),
    {
        let subject = self.transform.subject();
        log::debug!(
            "pump: {} -> {} -> {}",
            self.source.describe(),
            self.transform.name(),
            self.sink
                .as_ref()
                .map(|sink| sink.describe())
                .unwrap_or_else(|| "no sink".to_string())
        );

        let start = Instant::now();
        let mut frames: u64 = 0;
        let mut positive: u64 = 0;

        let end = loop {
            if self
                .stop
                .as_ref()
                .is_some_and(|stop| stop.load(Ordering::SeqCst))
            {
                break EndReason::Interrupted;
            }
            if self.max_frames.is_some_and(|limit| frames >= limit) {
                break EndReason::FrameLimit;
            }

            let frame = match self.source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => break EndReason::Exhausted,
                Err(err) => {
                    log::warn!("read from {} failed: {:#}", self.source.describe(), err);
                    break EndReason::ReadFailed;
                }
            };

            let out = self.transform.apply(frame)?;
            let flow = match self.sink.as_mut() {
                Some(sink) => sink.write(&out.frame)?,
                None => SinkFlow::Continue,
            };

            log::trace!(
                "frame {} done {:?} after decode",
                out.frame.index(),
                out.frame.age()
            );
            frames += 1;
            if out.is_positive() {
                positive += 1;
            }
            observe(frames);

            if flow == SinkFlow::Stop {
                break EndReason::UserExit;
            }
        };

        let stats = self.source.stats();
        log::debug!("{}: {} frames read", stats.source, stats.frames_read);
        let frames_written = self
            .sink
            .as_ref()
            .map(|sink| sink.frames_written())
            .unwrap_or(0);
        self.release()?;

        Ok(RunSummary {
            frames,
            frames_with_detection: subject.map(|_| positive),
            frames_written,
            elapsed: start.elapsed(),
            end,
            subject,
        })
    }

    /// Release the source and the sink. Later calls do nothing.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let source = self.source.release();
        let sink = match self.sink.as_mut() {
            Some(sink) => sink.release(),
            None => Ok(()),
        };
        source.and(sink)
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::warn!("failed to release pump handles: {:#}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::synthetic::{SyntheticConfig, SyntheticSource};

    fn stub(url: &str) -> Box<dyn FrameSource> {
        let config = SyntheticConfig::from_url(url).unwrap();
        Box::new(SyntheticSource::new(config))
    }

    #[test]
    fn counts_every_frame_until_exhausted() {
        let summary = FramePump::new(stub("stub://gradient?frames=7&width=8&height=6"))
            .run()
            .unwrap();
        assert_eq!(summary.frames, 7);
        assert_eq!(summary.end, EndReason::Exhausted);
        assert_eq!(summary.frames_with_detection, None);
        assert_eq!(summary.frames_written, 0);
    }

    #[test]
    fn frame_limit_stops_endless_source() {
        let summary = FramePump::new(stub("stub://uniform?width=4&height=4"))
            .with_max_frames(Some(3))
            .run()
            .unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.end, EndReason::FrameLimit);
    }

    #[test]
    fn raised_stop_flag_interrupts_before_reading() {
        let stop = Arc::new(AtomicBool::new(true));
        let summary = FramePump::new(stub("stub://uniform?width=4&height=4"))
            .with_stop_flag(stop)
            .run()
            .unwrap();
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.end, EndReason::Interrupted);
    }

    #[test]
    fn observer_sees_running_count() {
        let mut seen = Vec::new();
        FramePump::new(stub("stub://blink?frames=4&width=4&height=4"))
            .run_observed(|n| seen.push(n))
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn end_reason_labels() {
        assert_eq!(EndReason::Exhausted.to_string(), "end of stream");
        assert_eq!(EndReason::ReadFailed.to_string(), "read failed");
    }
}
