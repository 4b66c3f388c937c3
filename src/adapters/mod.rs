pub mod memory;
pub mod mock;
pub mod postgres;
pub mod seed;
pub mod system_clock;

pub use system_clock::SystemClock;
