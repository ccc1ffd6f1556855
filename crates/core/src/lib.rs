pub mod playback;
pub mod reader;
pub mod shared;
pub mod video;

#[cfg(test)]
mod test_support;
