/// Pixel layouts a codec may hand out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Gray8,
    Rgb24,
    Bgr24,
    Rgba32,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Gray8 => 1,
            PixelLayout::Rgb24 | PixelLayout::Bgr24 => 3,
            PixelLayout::Rgba32 => 4,
        }
    }
}

/// A frame in the backend's native layout, as returned by `retrieve`.
///
/// Rows may be padded: `stride` is the distance in bytes between the starts
/// of consecutive rows and is at least `width * bytes_per_pixel`.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub layout: PixelLayout,
}

impl RawFrame {
    /// Creates a frame with tightly packed rows.
    pub fn packed(data: Vec<u8>, width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            data,
            width,
            height,
            stride: width as usize * layout.bytes_per_pixel(),
            layout,
        }
    }

    /// Bytes a well-formed buffer must hold (the last row needs no padding).
    pub fn required_len(&self) -> usize {
        if self.height == 0 {
            return 0;
        }
        let row = self.width as usize * self.layout.bytes_per_pixel();
        self.stride * (self.height as usize - 1) + row
    }
}
