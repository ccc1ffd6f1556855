/// Name given to each reader's background decode thread.
pub const DECODE_THREAD_NAME: &str = "video-decode";

/// Largest forward gap (in frames) that playback closes by reading
/// sequentially; anything larger is a seek.
pub const PLAYBACK_MAX_SEQUENTIAL_READS: usize = 8;
