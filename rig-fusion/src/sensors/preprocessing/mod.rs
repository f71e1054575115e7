//! Range capture preprocessing.
//!
//! Filters applied to 3D captures before they take part in registration.
//!
//! ```text
//! RangeCloud → BilateralFilter → RangeCloud
//! ```

mod bilateral;

pub use bilateral::{BilateralConfig, BilateralFilter};
