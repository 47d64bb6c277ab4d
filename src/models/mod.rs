pub mod chart;
pub mod listing;
pub mod player;
pub mod preferences;
pub mod recommend;
pub mod usage_log;

pub use chart::*;
pub use listing::*;
pub use player::*;
pub use preferences::*;
pub use recommend::*;
pub use usage_log::*;
