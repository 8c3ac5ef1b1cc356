pub mod autoplay;
pub mod chart;
pub mod clock;
pub mod config;
pub mod console_display;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod filler;
pub mod input;
pub mod prng;
pub mod reducer;
pub mod scheduler;
pub mod session_log;
pub mod sustain;
pub mod timeline;
pub mod types;
