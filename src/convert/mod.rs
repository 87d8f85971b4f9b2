//! Memory-format converters: binary reals, integers, packed decimal.
//!
//! Loads classify the raw encoding into a register value; stores narrow a
//! register value through the rounding engine and report the flags. Whether
//! the narrowed value actually reaches memory is the dispatcher's call.

pub mod bcd;
pub mod int;
pub mod real;
