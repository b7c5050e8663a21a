/// Smallest room code handed out by the server.
pub const ROOM_CODE_MIN: u16 = 1000;
/// Largest room code handed out by the server.
pub const ROOM_CODE_MAX: u16 = 9999;
/// Number of distinct room codes that can be live at once.
pub const ROOM_CODE_SPACE: usize = (ROOM_CODE_MAX - ROOM_CODE_MIN + 1) as usize;

/// How often a controller streams its orientation (milliseconds).
pub const GYRO_INTERVAL_MS: u64 = 50;

/// Returns true if `code` is exactly four ASCII digits in the issued range.
pub fn is_valid_room_code(code: &str) -> bool {
    if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    code.parse::<u16>()
        .map(|n| (ROOM_CODE_MIN..=ROOM_CODE_MAX).contains(&n))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_space_covers_four_digit_range() {
        assert_eq!(ROOM_CODE_SPACE, 9000);
    }

    #[test]
    fn accepts_issued_codes() {
        assert!(is_valid_room_code("1000"));
        assert!(is_valid_room_code("4821"));
        assert!(is_valid_room_code("9999"));
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(!is_valid_room_code("0000"));
        assert!(!is_valid_room_code("0999"));
        assert!(!is_valid_room_code("482"));
        assert!(!is_valid_room_code("48210"));
        assert!(!is_valid_room_code("48a1"));
        assert!(!is_valid_room_code("+482"));
        assert!(!is_valid_room_code(""));
    }
}
