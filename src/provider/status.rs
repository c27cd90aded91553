use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Outcome flags of a batch write.
///
/// Zero is full success. Flags accumulate across the items of a batch, so a
/// caller that needs a boolean checks [`WriteStatus::is_success`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WriteStatus(u32);

impl WriteStatus {
    pub const SUCCESS: WriteStatus = WriteStatus(0);
    /// A backend operation failed.
    pub const EXCEPTION: WriteStatus = WriteStatus(1);
    /// Nothing to do: empty batch or no changed fields.
    pub const EMPTY: WriteStatus = WriteStatus(2);
    /// Row written but a stream payload could not be saved.
    pub const STREAM_FAILURE: WriteStatus = WriteStatus(4);
    /// No stored row matched the record's key.
    pub const NOT_FOUND: WriteStatus = WriteStatus(8);

    pub fn from_bits(bits: u32) -> Self {
        WriteStatus(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: WriteStatus) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: WriteStatus) {
        self.0 |= other.0;
    }
}

impl BitOr for WriteStatus {
    type Output = WriteStatus;

    fn bitor(self, rhs: WriteStatus) -> WriteStatus {
        WriteStatus(self.0 | rhs.0)
    }
}

impl BitOrAssign for WriteStatus {
    fn bitor_assign(&mut self, rhs: WriteStatus) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return f.write_str("success");
        }
        let names: Vec<&str> = [
            (WriteStatus::EXCEPTION, "exception"),
            (WriteStatus::EMPTY, "empty"),
            (WriteStatus::STREAM_FAILURE, "stream-failure"),
            (WriteStatus::NOT_FOUND, "not-found"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
        if names.is_empty() {
            write!(f, "{:#x}", self.0)
        } else {
            f.write_str(&names.join("|"))
        }
    }
}
