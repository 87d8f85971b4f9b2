#![cfg_attr(debug_assertions, allow(dead_code))]

//! Software x87 floating-point unit.
//!
//! Register values live in an unpacked extended-precision form ([`FpReg`])
//! with an explicit classification tag; the memory converters translate the
//! architectural 32/64/80-bit reals, the three integer widths, and packed
//! decimal at the boundary. Every operation funnels through one rounding
//! engine honoring the control word's rounding and precision fields, and
//! through one exception commit path that keeps masked-default substitution
//! and unmasked faults in a single place.
//!
//! A host embeds the unit by driving [`decode::exec::exec_reg`] and
//! [`decode::exec::exec_mem`] with escape/ModR-M pairs and resolved memory
//! operands; everything below that (arithmetic core, transcendental kernels,
//! state images) is usable on its own.

pub mod arith;
pub mod config;
pub mod context;
pub mod convert;
pub mod decode;
pub mod logging;
pub mod reg;
pub mod round;
pub mod state;
pub mod trans;
pub mod words;

mod ext;
mod utils;

pub use config::{FpuConfig, OperandSize, QuirkMode};
pub use context::{FpuContext, PointerPair};
pub use decode::exec::{CpuBridge, MemOperand, exec_mem, exec_reg};
pub use reg::{FpReg, Sign, Tag};
pub use words::{ControlWord, ExnFlags, FpuFault, PrecisionMode, RoundMode, StatusWord};
