//! Núcleo da biblioteca.

pub mod memory;
