pub mod video_playback;
