pub mod health;
pub mod payouts;
pub mod superadmin;

pub use health::health_config;
pub use payouts::razorpay_config;
pub use superadmin::superadmin_config;
