use std::path::Path;

use crate::shared::frame::Frame;

/// Persists decoded frames as still images.
pub trait ImageWriter: Send {
    /// Writes `frame` to `path`, scaled to `size` when given. The image format
    /// follows the path's extension.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
