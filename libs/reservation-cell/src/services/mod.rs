pub mod clock;
pub mod engine;
pub mod maintenance;
pub mod time_block;

pub use clock::*;
pub use engine::*;
pub use maintenance::*;
pub use time_block::*;
