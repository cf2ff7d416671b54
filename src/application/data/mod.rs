mod listing_change;
mod log_level;

pub use listing_change::ListingChange;
pub use log_level::LogLevel;
