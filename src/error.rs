//! Common error definitions.

use core::fmt;

use crate::poll::Timeout;

macro_rules! impl_from_error {
    ($error:ident) => {
        impl From<$error> for Error {
            fn from(error: $error) -> Self {
                Self::$error(error)
            }
        }
    };
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Collection of all errors that a register access can report.
///
/// Every variant except [`Error::Timeout`] is a caller mistake. When one is returned, the
/// register was left untouched.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Bit position, width, or their sum fall outside the 32-bit register.
    InvalidSpan { position: u8, width: u8 },
    /// The span overlaps reserved bits. `mask` holds the offending bits.
    ReservedBits { mask: u32 },
    /// The value does not fit in the field.
    ValueTooWide { value: u32, width: u8 },
    /// No instance of the peripheral family has this index.
    UnknownInstance(u8),
    /// The register does not exist on this instance.
    Unimplemented { register: &'static str },
    /// Reading a write-only register, writing a read-only one, or a write the register
    /// refuses (e.g. setting a flag that hardware only clears).
    AccessDenied,
    /// The bit sits inside a multi-bit field, or the register has overlapping layouts; the
    /// width has to be given explicitly.
    AmbiguousWidth { position: u8 },
    /// A consumer-level parameter (baud rate, bus frequency, ...) is out of range.
    InvalidConfig(&'static str),
    /// A bounded poll ran out of iterations.
    Timeout(Timeout),
}

impl_from_error!(Timeout);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpan { position, width } => {
                write!(f, "bit span {position}+{width} does not fit in 32 bits")
            }
            Self::ReservedBits { mask } => write!(f, "span touches reserved bits {mask:#010x}"),
            Self::ValueTooWide { value, width } => {
                write!(f, "value {value:#x} does not fit in {width} bits")
            }
            Self::UnknownInstance(index) => write!(f, "no peripheral instance {index}"),
            Self::Unimplemented { register } => {
                write!(f, "register {register} is not implemented on this instance")
            }
            Self::AccessDenied => f.write_str("access not permitted by the register"),
            Self::AmbiguousWidth { position } => {
                write!(f, "bit {position} needs an explicit field width")
            }
            Self::InvalidConfig(what) => write!(f, "invalid configuration: {what}"),
            Self::Timeout(timeout) => write!(f, "{timeout}"),
        }
    }
}
