//! Operator confirmation capability for destructive SLAM transitions.

/// Synchronous yes/no prompt.
///
/// Implementations may block (an interactive prompt) or answer from a fixed
/// policy (tests, unattended runs).
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

impl<T: Confirm + ?Sized> Confirm for &T {
    fn confirm(&self, message: &str) -> bool {
        (**self).confirm(message)
    }
}

/// Fixed-answer confirmation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    Accept,
    Decline,
}

impl Confirm for ConfirmPolicy {
    fn confirm(&self, _message: &str) -> bool {
        matches!(self, Self::Accept)
    }
}
