mod decode_worker;
mod seek_coordinator;
pub mod shared_state;
pub mod video_reader;
