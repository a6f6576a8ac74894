/// Convert a binary number to binary coded decimal output.
///
/// Input must be in range 0-99 to get a valid return.
pub const fn to_bcd(binary: u8) -> Option<u8> {
    if binary > 99 {
        None
    } else {
        Some((binary / 10) * 0x10 + binary % 10)
    }
}

/// Convert a number from binary coded decimal input.
///
/// Input must be in range 0x0-0x9, 0x10-0x19, ...
pub const fn from_bcd(bcd: u8) -> Option<u8> {
    let tens = bcd / 0x10;
    let units = bcd % 0x10;
    if tens > 0x9 || units > 0x9 {
        None
    } else {
        Some(tens * 10 + units)
    }
}

/// Minute, second and frame of a frame count, each as BCD.
///
/// Minutes past 99 saturate, as they would on the subcode channel.
pub const fn frames_to_bcd_msf(frames: u32) -> [u8; 3] {
    let minute = frames / (60 * 75);
    let minute = if minute > 99 { 99 } else { minute as u8 };
    let second = ((frames / 75) % 60) as u8;
    let frame = (frames % 75) as u8;
    // All three are in range by construction.
    let (Some(m), Some(s), Some(f)) = (to_bcd(minute), to_bcd(second), to_bcd(frame)) else {
        return [0; 3];
    };
    [m, s, f]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_limits() {
        assert_eq!(to_bcd(99), Some(0x99));
        assert_eq!(to_bcd(100), None);
        assert_eq!(from_bcd(0x1A), None);
        assert_eq!(from_bcd(0x42), Some(42));
    }

    #[test]
    fn msf_of_two_second_pregap() {
        assert_eq!(frames_to_bcd_msf(150), [0x00, 0x02, 0x00]);
        assert_eq!(frames_to_bcd_msf(60 * 75 + 74), [0x01, 0x00, 0x74]);
    }
}
