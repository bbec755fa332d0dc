pub mod admin;
pub mod clock;
pub mod health;
pub mod payouts;
pub mod sse;
pub mod validation;
