//! Legacy open-mode bitmask decoding.

/// Open the database read-only.
pub const OPEN_READONLY: i32 = 0x01;
/// Open the database for reading and writing.
pub const OPEN_READWRITE: i32 = 0x02;
/// Create the database file if it does not exist.
pub const OPEN_CREATE: i32 = 0x04;

/// Default mode when the caller supplies none.
pub const OPEN_DEFAULT: i32 = OPEN_READWRITE + OPEN_CREATE;

/// Engine-facing open options decoded from the legacy bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub readonly: bool,
    pub file_must_exist: bool,
}

impl OpenOptions {
    /// Decode a legacy open-mode bitmask.
    ///
    /// Callers historically combine the flags by addition rather than
    /// bitwise OR, so bit presence is tested with integer division and
    /// modulo instead of masking. `readonly` holds only when the read-only
    /// bit is set and the read-write bit is not; `file_must_exist` holds
    /// only when the create bit is absent. Unknown bits are ignored.
    #[must_use]
    pub fn decode(flags: i32) -> OpenOptions {
        let readonly_bit = bit_present(flags, OPEN_READONLY);
        let readwrite_bit = bit_present(flags, OPEN_READWRITE);
        let create_bit = bit_present(flags, OPEN_CREATE);
        OpenOptions {
            readonly: readonly_bit && !readwrite_bit,
            file_must_exist: !create_bit,
        }
    }
}

fn bit_present(flags: i32, bit: i32) -> bool {
    (flags / bit) % 2 == 1
}
