macro_rules! bit {
    ($bit_num:expr) => {
        1 << $bit_num
    };
}

pub(crate) use bit;

/// Extract `width` bits of a packed firmware word, starting at `shift`.
pub const fn field(word: u32, shift: u32, width: u32) -> u32 {
    (word >> shift) & ((1 << width) - 1)
}

/// Place `value` into a `width`-bit field at `shift`. Excess bits are dropped.
pub const fn pack(value: u32, shift: u32, width: u32) -> u32 {
    (value & ((1 << width) - 1)) << shift
}
