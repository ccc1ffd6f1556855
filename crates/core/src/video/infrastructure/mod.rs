pub mod ffmpeg_codec;
pub mod image_file_writer;
pub mod rgba_converter;
