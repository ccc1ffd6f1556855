use thiserror::Error;

use crate::reader::shared_state::EndReason;
use crate::reader::video_reader::VideoReader;
use crate::shared::constants::PLAYBACK_MAX_SEQUENTIAL_READS;
use crate::shared::frame::Frame;

/// Absorbs clock rounding so exact frame times land on their own frame.
const FRAME_TIME_EPSILON: f64 = 1e-6;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("playback needs an open video reader")]
    ReaderNotOpen,
}

/// Drives a [`VideoReader`] from a playback clock.
///
/// Each `advance` moves the clock and shows the frame at
/// `floor(pos_sec * fps)`. Nearby forward frames are read in order so the
/// decoder's look-ahead is used; anything else repositions the reader.
pub struct VideoPlayback {
    reader: VideoReader,
    looping: bool,
    pos_sec: f64,
    current: Option<Frame>,
}

impl VideoPlayback {
    /// Starts playback at 0 s and reads the first frame.
    pub fn new(reader: VideoReader, looping: bool) -> Result<Self, PlaybackError> {
        if !reader.is_open() {
            return Err(PlaybackError::ReaderNotOpen);
        }
        let mut playback = Self {
            reader,
            looping,
            pos_sec: 0.0,
            current: None,
        };
        playback.reader.set_current_frame_index(0);
        playback.current = playback.reader.read_frame();
        Ok(playback)
    }

    pub fn advance(&mut self, delta_sec: f64) {
        self.set_pos_sec(self.pos_sec + delta_sec);
    }

    pub fn reset(&mut self) {
        self.set_pos_sec(0.0);
    }

    /// Moves the clock to `pos_sec` and shows the frame at that time.
    ///
    /// Past the end the clock wraps when looping and otherwise stops at
    /// `length_sec`, holding the last frame.
    pub fn set_pos_sec(&mut self, pos_sec: f64) {
        let length = self.length_sec();
        let pos_sec = pos_sec.max(0.0);
        self.pos_sec = match length {
            l if l <= 0.0 => pos_sec,
            l if self.looping => pos_sec.rem_euclid(l),
            l => pos_sec.min(l),
        };
        self.show(self.frame_at(self.pos_sec));
    }

    pub fn pos_sec(&self) -> f64 {
        self.pos_sec
    }

    pub fn length_sec(&self) -> f64 {
        self.reader.length_sec()
    }

    pub fn is_loop(&self) -> bool {
        self.looping
    }

    /// The frame currently shown, if any frame could be read yet.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    pub fn current_frame_index(&self) -> Option<usize> {
        self.current.as_ref().map(Frame::index)
    }

    pub fn reader(&self) -> &VideoReader {
        &self.reader
    }

    pub fn into_reader(self) -> VideoReader {
        self.reader
    }

    fn frame_at(&self, pos_sec: f64) -> usize {
        let index = (pos_sec * self.reader.fps() + FRAME_TIME_EPSILON).floor() as usize;
        match self.reader.frame_count() {
            0 => index,
            count => index.min(count - 1),
        }
    }

    fn show(&mut self, target: usize) {
        if self.current_frame_index() == Some(target) {
            return;
        }

        let next = self.reader.current_frame_index();
        let sequential = target >= next && target - next < PLAYBACK_MAX_SEQUENTIAL_READS;
        if !sequential {
            log::debug!("Playback jumping to frame {target}");
            self.reader.set_current_frame_index(target);
        }

        while self.reader.current_frame_index() <= target {
            match self.reader.read_frame() {
                Some(frame) => self.current = Some(frame),
                None => {
                    self.on_stream_end();
                    return;
                }
            }
        }
    }

    /// The reader ran out before the clock did, so the reported length was
    /// wrong or unknown. Without looping the last frame stays shown.
    fn on_stream_end(&mut self) {
        let stopped = self.reader.end_reason() == Some(&EndReason::Stopped);
        if !self.looping || stopped || self.reader.current_frame_index() == 0 {
            return;
        }
        log::debug!(
            "Playback looping after frame {}",
            self.reader.current_frame_index()
        );
        self.pos_sec = 0.0;
        self.reader.set_current_frame_index(0);
        if let Some(frame) = self.reader.read_frame() {
            self.current = Some(frame);
        }
    }
}
