//! Error types for the VM and its host-facing API.

use thiserror::Error;

/// Errors raised by VM operations on behalf of the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// The reallocate callback refused a request.
    #[error("Out of memory.")]
    OutOfMemory,
    #[error("host contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),
    /// A host request that cannot be satisfied, e.g. defining a method on a
    /// name that holds something other than a class.
    #[error("{0}")]
    Host(String),
}

/// Misuse of the foreign-call API by a host function.
///
/// A violation aborts the running fiber with an error that scripts cannot
/// catch, and is kept on the VM for the host to inspect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("no foreign call is in progress")]
    NoForeignCall,
    #[error("slot {index} is out of range for a call with {count} slots")]
    InvalidSlot { index: i64, count: usize },
    #[error("foreign method returned more than once")]
    DoubleReturn,
    #[error("slot {index} was read after the foreign method returned")]
    ReadAfterReturn { index: i64 },
    #[error("the VM cannot be re-entered from a foreign method")]
    Reentrant,
    #[error("string length {length} is invalid; use -1 for a NUL-terminated string")]
    InvalidLength { length: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(VmError::OutOfMemory.to_string(), "Out of memory.");
        assert_eq!(
            VmError::from(ContractViolation::InvalidSlot { index: 3, count: 2 }).to_string(),
            "host contract violation: slot 3 is out of range for a call with 2 slots"
        );
    }
}
