pub mod dates;
pub mod grid_fill;
pub mod locale;

pub use dates::{date_string_to_days, parse_days_to_expiry};
pub use grid_fill::fill_missing;
pub use locale::parse_num;
