pub mod image_writer;
pub mod pixel_converter;
pub mod raw_frame;
pub mod video_codec;
