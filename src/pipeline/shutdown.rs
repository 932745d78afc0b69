use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One-shot, process-wide shutdown flag shared by every stage.
///
/// The reason is stored before the flag is published, so a reader that observes
/// `is_signaled()` also sees `reason()`.
#[derive(Debug, Default)]
pub struct Termination {
    signaled: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl Termination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns `true` for the call that actually set it; later calls keep
    /// the first reason.
    pub fn signal(&self, reason: impl Into<String>) -> bool {
        let mut slot = match self.reason.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            return false;
        }
        let reason = reason.into();
        log::info!("termination signaled: {}", reason);
        *slot = Some(reason);
        self.signaled.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        match self.reason.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn signal_is_one_shot() {
        let termination = Termination::new();
        assert!(!termination.is_signaled());
        assert!(termination.signal("display closed"));
        assert!(!termination.signal("ctrl-c"));
        assert!(termination.is_signaled());
        assert_eq!(termination.reason().as_deref(), Some("display closed"));
    }

    #[test]
    fn reason_is_visible_once_signaled() {
        let termination = Arc::new(Termination::new());
        let signalers: Vec<_> = ["ctrl-c", "display closed", "infer failed"]
            .into_iter()
            .map(|reason| {
                let termination = Arc::clone(&termination);
                thread::spawn(move || termination.signal(reason))
            })
            .collect();

        while !termination.is_signaled() {
            thread::yield_now();
        }
        let seen = termination.reason();
        assert!(seen.is_some());

        let winners = signalers
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(termination.reason(), seen);
    }
}
