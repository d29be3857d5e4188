//! Common types shared by the whole crate: the structured [`Value`], the
//! [`Convertible`] mapping trait, constants, number formatting and name validation.

mod constants;
mod convertible;
mod number_format;
mod validation;
mod value;

pub use constants::*;
pub use convertible::*;
pub use number_format::*;
pub use validation::*;
pub use value::*;
