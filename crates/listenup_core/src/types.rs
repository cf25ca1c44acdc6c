//! Identifier newtypes for transactions and commits.

use std::fmt;

macro_rules! counter_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            #[doc = concat!("Wraps a raw ", $label, " value.")]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Raw value, as written to the WAL.
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, ":{}"), self.0)
            }
        }
    };
}

counter_type!(
    /// Identifies a write transaction in the WAL.
    ///
    /// Allocated from a counter that recovery restarts above the highest id
    /// seen in the log. Id 0 is reserved for checkpoint batches.
    TransactionId,
    "txn"
);

counter_type!(
    /// Position in the commit order.
    ///
    /// Each successful commit that writes something gets the next value. A
    /// snapshot reads everything committed at or below its sequence.
    SequenceNumber,
    "seq"
);

impl SequenceNumber {
    /// The sequence the next commit will get.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}
