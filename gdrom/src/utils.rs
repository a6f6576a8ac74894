pub mod bits;
pub mod bcd;
