//! Stub codecs for exercising the reader without real media.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::video::domain::raw_frame::{PixelLayout, RawFrame};
use crate::video::domain::video_codec::{CodecError, CodecProperty, VideoCodec};

/// Counters shared between a stub codec and the test observing it.
#[derive(Default)]
pub struct CodecProbe {
    pub opens: AtomicUsize,
    pub grabs: AtomicUsize,
    pub retrieves: AtomicUsize,
    pub seeks: Mutex<Vec<usize>>,
    pub closed: AtomicBool,
}

impl CodecProbe {
    pub fn retrieves(&self) -> usize {
        self.retrieves.load(Ordering::SeqCst)
    }

    pub fn seeks(&self) -> Vec<usize> {
        self.seeks.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Polls `condition` until it holds or `timeout` passes. Returns whether it
/// held in time.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// In-memory source of `frames` gray frames; each frame's pixels hold its
/// position modulo 256, so tests can tell which frame the backend produced.
pub struct ScriptedCodec {
    frames: usize,
    fps: f64,
    reported_frames: Option<usize>,
    fail_open: bool,
    fail_retrieve_at: Option<usize>,
    position: usize,
    grabbed: Option<usize>,
    open: bool,
    probe: Arc<CodecProbe>,
}

impl ScriptedCodec {
    pub const WIDTH: u32 = 4;
    pub const HEIGHT: u32 = 2;

    pub fn new(frames: usize, fps: f64) -> Self {
        Self {
            frames,
            fps,
            reported_frames: None,
            fail_open: false,
            fail_retrieve_at: None,
            position: 0,
            grabbed: None,
            open: false,
            probe: Arc::new(CodecProbe::default()),
        }
    }

    pub fn with_probe(mut self, probe: Arc<CodecProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Reports a different frame count than the source actually holds.
    pub fn reporting_frames(mut self, reported: usize) -> Self {
        self.reported_frames = Some(reported);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_retrieve_at(mut self, index: usize) -> Self {
        self.fail_retrieve_at = Some(index);
        self
    }
}

impl VideoCodec for ScriptedCodec {
    fn open(&mut self, path: &Path) -> Result<(), CodecError> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(CodecError::Open {
                path: path.to_path_buf(),
                source: "scripted open failure".into(),
            });
        }
        self.open = true;
        self.position = 0;
        self.probe.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn grab(&mut self) -> bool {
        self.probe.grabs.fetch_add(1, Ordering::SeqCst);
        if !self.open || self.position >= self.frames {
            self.grabbed = None;
            return false;
        }
        self.grabbed = Some(self.position);
        self.position += 1;
        true
    }

    fn retrieve(&mut self) -> Result<RawFrame, CodecError> {
        assert!(!self.probe.is_closed(), "retrieve on a closed codec");
        if !self.open {
            return Err(CodecError::NotOpen);
        }
        let index = self.grabbed.take().ok_or(CodecError::NothingGrabbed)?;
        self.probe.retrieves.fetch_add(1, Ordering::SeqCst);
        if self.fail_retrieve_at == Some(index) {
            return Err(CodecError::Decode("scripted retrieve failure".into()));
        }
        let len = (Self::WIDTH * Self::HEIGHT) as usize;
        Ok(RawFrame::packed(
            vec![(index % 256) as u8; len],
            Self::WIDTH,
            Self::HEIGHT,
            PixelLayout::Gray8,
        ))
    }

    fn set_position(&mut self, frame_index: usize) -> Result<(), CodecError> {
        if !self.open {
            return Err(CodecError::NotOpen);
        }
        self.probe.seeks.lock().unwrap().push(frame_index);
        self.position = frame_index;
        self.grabbed = None;
        Ok(())
    }

    fn property(&self, property: CodecProperty) -> f64 {
        if !self.open {
            return 0.0;
        }
        match property {
            CodecProperty::Width => Self::WIDTH as f64,
            CodecProperty::Height => Self::HEIGHT as f64,
            CodecProperty::Fps => self.fps,
            CodecProperty::FrameCount => self.reported_frames.unwrap_or(self.frames) as f64,
        }
    }

    fn close(&mut self) {
        self.open = false;
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

/// Codec whose `grab` blocks until the test sends a verdict through the gate:
/// `true` produces a frame, `false` (or a dropped sender) reports end of
/// stream.
pub struct GatedCodec {
    gate: Receiver<bool>,
    frames: usize,
    position: usize,
    grabbed: Option<usize>,
    probe: Arc<CodecProbe>,
}

impl GatedCodec {
    pub fn new(gate: Receiver<bool>, frames: usize, probe: Arc<CodecProbe>) -> Self {
        Self {
            gate,
            frames,
            position: 0,
            grabbed: None,
            probe,
        }
    }
}

impl VideoCodec for GatedCodec {
    fn open(&mut self, _path: &Path) -> Result<(), CodecError> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        self.probe.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn grab(&mut self) -> bool {
        self.probe.grabs.fetch_add(1, Ordering::SeqCst);
        if self.gate.recv().unwrap_or(false) {
            self.grabbed = Some(self.position);
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn retrieve(&mut self) -> Result<RawFrame, CodecError> {
        assert!(!self.probe.is_closed(), "retrieve on a closed codec");
        let index = self.grabbed.take().ok_or(CodecError::NothingGrabbed)?;
        self.probe.retrieves.fetch_add(1, Ordering::SeqCst);
        Ok(RawFrame::packed(
            vec![(index % 256) as u8; 1],
            1,
            1,
            PixelLayout::Gray8,
        ))
    }

    fn set_position(&mut self, frame_index: usize) -> Result<(), CodecError> {
        self.probe.seeks.lock().unwrap().push(frame_index);
        self.position = frame_index;
        Ok(())
    }

    fn property(&self, property: CodecProperty) -> f64 {
        match property {
            CodecProperty::Width | CodecProperty::Height => 1.0,
            CodecProperty::Fps => 30.0,
            CodecProperty::FrameCount => self.frames as f64,
        }
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}
