//! Handling Ctrl-C: let the current oracle call finish, then stop after
//! the strategy's next speculative removal, saving whatever has been
//! reduced so far. There is a single thread here, so one static flag is
//! enough; no signal needs forwarding anywhere.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl-C handler. Must be called at most once per process.
pub fn install() -> Result<(), ::ctrlc::Error> {
    ::ctrlc::set_handler(|| {
        INTERRUPTED.store(true, Ordering::SeqCst);
    })
}

/// Has Ctrl-C been pressed since the process started (or since `reset` was
/// last called)?
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Clear the interrupted flag. Exposed for tests; the run controller never
/// needs to call this in normal operation.
#[cfg(test)]
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninterrupted() {
        reset();
        assert!(!interrupted());
    }

    #[test]
    fn flag_is_observable_once_set() {
        reset();
        INTERRUPTED.store(true, Ordering::SeqCst);
        assert!(interrupted());
        reset();
    }
}
