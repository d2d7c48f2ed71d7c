//! Built-in command mnemonics.
//!
//! A mnemonic is the single ASCII byte that opens every token. The
//! payload-bearing set is fixed; every other mnemonic is a bare command.

/// Child exit code (bare).
pub const EXIT_CODE: u8 = b'X';

/// Child terminating signal number (bare).
pub const SIGNAL: u8 = b'S';

/// Child process id (bare).
pub const PID: u8 = b'P';

/// Helper process id (bare). Emitted by the helper, carries no event.
pub const MASTER_PID: u8 = b'M';

/// Child stdout chunk.
pub const STDOUT: u8 = b'O';

/// Child stderr chunk.
pub const STDERR: u8 = b'E';

/// Echo of bytes the helper forwarded to the child's stdin.
pub const STDIN: u8 = b'I';

/// Out-of-band control message from the helper.
pub const CONTROL: u8 = b'C';

/// Token terminator.
pub const DELIMITER: u8 = b':';

/// Mnemonics whose argument is the byte length of a following payload.
pub const PAYLOAD_BEARING: [u8; 4] = [STDOUT, STDERR, STDIN, CONTROL];

/// Returns true if the mnemonic is followed by a raw payload on the wire.
pub fn has_payload(mnemonic: u8) -> bool {
    PAYLOAD_BEARING.contains(&mnemonic)
}

/// Returns true if the byte can open a token.
pub fn is_valid_mnemonic(byte: u8) -> bool {
    byte.is_ascii() && !byte.is_ascii_digit() && byte != DELIMITER
}

/// Returns a human-readable name for a mnemonic.
pub fn mnemonic_name(mnemonic: u8) -> &'static str {
    match mnemonic {
        EXIT_CODE => "EXIT_CODE",
        SIGNAL => "SIGNAL",
        PID => "PID",
        MASTER_PID => "MASTER_PID",
        STDOUT => "STDOUT",
        STDERR => "STDERR",
        STDIN => "STDIN",
        CONTROL => "CONTROL",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_alphabet_is_fixed() {
        for m in [b'O', b'E', b'I', b'C'] {
            assert!(has_payload(m), "{} should carry a payload", m as char);
        }
        for m in [b'X', b'S', b'P', b'M', b'D', b'Z'] {
            assert!(!has_payload(m), "{} should be bare", m as char);
        }
    }

    #[test]
    fn digits_and_delimiter_cannot_open_a_token() {
        assert!(is_valid_mnemonic(b'X'));
        assert!(is_valid_mnemonic(b'd'));
        assert!(!is_valid_mnemonic(b'7'));
        assert!(!is_valid_mnemonic(b':'));
        assert!(!is_valid_mnemonic(0xC3));
    }

    #[test]
    fn names() {
        assert_eq!(mnemonic_name(STDOUT), "STDOUT");
        assert_eq!(mnemonic_name(MASTER_PID), "MASTER_PID");
        assert_eq!(mnemonic_name(b'?'), "UNKNOWN");
    }
}
