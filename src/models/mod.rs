//! Pricing models and dealer conventions
//!
//! Implements:
//! - Black-Scholes (closed-form Greeks for every contract in the book)
//! - Dealer conventions (sign/weight applied to raw Greeks)

pub mod black_scholes;
pub mod convention;

pub use black_scholes::*;
pub use convention::*;
