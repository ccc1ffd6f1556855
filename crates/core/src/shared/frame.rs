/// Number of channels in an engine frame (RGBA).
pub const FRAME_CHANNELS: u8 = 4;

/// A decoded, converted video frame: contiguous RGBA bytes in row-major order.
///
/// This is the engine-level image handed from the decode worker to the caller.
/// It is moved, never shared, so ownership of the pixel buffer transfers with
/// each `read_frame`.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Position of this frame in the source, 0-based.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the channel values of the pixel at `(x, y)`, or `None` when
    /// out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        self.data.get(start..start + c)
    }
}
