pub mod jwt;
pub mod money;

pub use jwt::*;
pub use money::{MAX_AMOUNT_MINOR, percent_of, to_major_units, to_minor_units};
