use std::path::Path;

use crate::video::domain::raw_frame::{PixelLayout, RawFrame};
use crate::video::domain::video_codec::{CodecError, CodecProperty, VideoCodec};

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// `grab` decodes the next frame of the best video stream; `retrieve` scales
/// it to RGB24. Seeking jumps to the closest preceding keyframe and decodes
/// forward until the requested frame index.
pub struct FfmpegCodec {
    session: Option<Session>,
}

// Safety: FfmpegCodec is moved into the decode worker and only used from that
// thread afterwards. The raw pointers inside ffmpeg types are never shared.
unsafe impl Send for FfmpegCodec {}

struct Session {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    /// Seconds per stream timestamp tick.
    time_base: f64,
    start_pts: i64,
    width: u32,
    height: u32,
    fps: f64,
    frame_count: usize,
    grabbed: Option<ffmpeg_next::util::frame::video::Video>,
    /// Frame decoded while seeking; returned by the next `grab`.
    pending: Option<ffmpeg_next::util::frame::video::Video>,
    flushing: bool,
    done: bool,
}

impl FfmpegCodec {
    pub fn new() -> Self {
        Self { session: None }
    }
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoCodec for FfmpegCodec {
    fn open(&mut self, path: &Path) -> Result<(), CodecError> {
        self.close();

        let open_err = |e: ffmpeg_next::Error| CodecError::Open {
            path: path.to_path_buf(),
            source: Box::new(e),
        };

        ffmpeg_next::init().map_err(open_err)?;
        let ictx = ffmpeg_next::format::input(path).map_err(open_err)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CodecError::NoVideoStream(path.to_path_buf()))?;

        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(open_err)?;
        let decoder = codec_ctx.decoder().video().map_err(open_err)?;

        let fps = match rational_to_f64(stream.avg_frame_rate()) {
            fps if fps > 0.0 => fps,
            _ => rational_to_f64(stream.rate()),
        };
        let time_base = rational_to_f64(stream.time_base());
        let start_pts = stream.start_time().max(0);
        let frame_count = if stream.frames() > 0 {
            stream.frames() as usize
        } else {
            estimate_frame_count(ictx.duration(), fps)
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(open_err)?;

        self.session = Some(Session {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            start_pts,
            width,
            height,
            fps,
            frame_count,
            grabbed: None,
            pending: None,
            flushing: false,
            done: false,
        });
        Ok(())
    }

    fn grab(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let next = match session.pending.take() {
            Some(frame) => Some(frame),
            None => session.decode_next(),
        };
        session.grabbed = next;
        session.grabbed.is_some()
    }

    fn retrieve(&mut self) -> Result<RawFrame, CodecError> {
        let session = self.session.as_mut().ok_or(CodecError::NotOpen)?;
        let decoded = session.grabbed.take().ok_or(CodecError::NothingGrabbed)?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        session
            .scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| CodecError::Decode(Box::new(e)))?;

        Ok(RawFrame {
            data: rgb_frame.data(0).to_vec(),
            width: session.width,
            height: session.height,
            stride: rgb_frame.stride(0),
            layout: PixelLayout::Rgb24,
        })
    }

    fn set_position(&mut self, frame_index: usize) -> Result<(), CodecError> {
        let session = self.session.as_mut().ok_or(CodecError::NotOpen)?;
        session.seek(frame_index)
    }

    fn property(&self, property: CodecProperty) -> f64 {
        let Some(session) = self.session.as_ref() else {
            return 0.0;
        };
        match property {
            CodecProperty::Width => session.width as f64,
            CodecProperty::Height => session.height as f64,
            CodecProperty::Fps => session.fps,
            CodecProperty::FrameCount => session.frame_count as f64,
        }
    }

    fn close(&mut self) {
        self.session = None;
    }
}

impl Session {
    /// Pulls the next decoded frame of the video stream, flushing the decoder
    /// once the container runs out of packets.
    fn decode_next(&mut self) -> Option<ffmpeg_next::util::frame::video::Video> {
        if self.done {
            return None;
        }

        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Some(decoded);
            }

            if self.flushing {
                self.done = true;
                return None;
            }

            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        log::debug!("Skipping undecodable packet: {e}");
                    }
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                }
            }
        }
    }

    fn seek(&mut self, frame_index: usize) -> Result<(), CodecError> {
        self.grabbed = None;
        self.pending = None;

        let target_sec = if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        };
        let start_sec = self.start_pts as f64 * self.time_base;
        let ts = ((start_sec + target_sec) * MICROS_PER_SEC) as i64;

        self.ictx
            .seek(ts, ..ts)
            .map_err(|e| CodecError::Seek {
                index: frame_index,
                source: Box::new(e),
            })?;
        self.decoder.flush();
        self.flushing = false;
        self.done = false;

        while let Some(frame) = self.decode_next() {
            if seek_landed(self.frame_index_of(&frame), frame_index)? {
                self.pending = Some(frame);
                break;
            }
        }
        Ok(())
    }

    fn frame_index_of(&self, frame: &ffmpeg_next::util::frame::video::Video) -> Option<usize> {
        let ts = frame.timestamp().or(frame.pts())?;
        let sec = (ts - self.start_pts) as f64 * self.time_base;
        Some((sec * self.fps).round().max(0.0) as usize)
    }
}

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Whether a frame decoded while seeking is the one to resume from. Frames
/// without a timestamp cannot be placed, so the seek fails instead of
/// returning the keyframe under the target's index.
fn seek_landed(decoded: Option<usize>, target: usize) -> Result<bool, CodecError> {
    match decoded {
        Some(index) => Ok(index >= target),
        None => Err(CodecError::Seek {
            index: target,
            source: "decoded frame has no timestamp".into(),
        }),
    }
}

fn rational_to_f64(rate: ffmpeg_next::Rational) -> f64 {
    if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}

/// Estimates the frame count from a container duration in microseconds.
fn estimate_frame_count(duration_us: i64, fps: f64) -> usize {
    if duration_us <= 0 || fps <= 0.0 {
        return 0;
    }
    (duration_us as f64 / MICROS_PER_SEC * fps).round() as usize
}
