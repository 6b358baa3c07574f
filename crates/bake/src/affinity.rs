use std::thread::{self, ThreadId};

/// Records the thread that owns a graphics or physics context.
///
/// Calls from any other thread are a contract violation, caught in debug builds.
#[derive(Debug, Clone)]
pub struct ThreadAffinity {
    owner: ThreadId,
    label: &'static str,
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    pub fn current(label: &'static str) -> Self {
        Self {
            owner: thread::current().id(),
            label,
        }
    }

    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    #[track_caller]
    pub fn check(&self) {
        debug_assert!(
            self.is_owner(),
            "{} used off its owning thread ({:?} != {:?})",
            self.label,
            thread::current().id(),
            self.owner
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_thread_passes() {
        let affinity = ThreadAffinity::current("test");
        assert!(affinity.is_owner());
        affinity.check();
    }

    #[test]
    fn other_thread_is_not_owner() {
        let affinity = ThreadAffinity::current("test");
        let seen = thread::spawn(move || affinity.is_owner()).join().unwrap();
        assert!(!seen);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn other_thread_check_panics_in_debug() {
        let affinity = ThreadAffinity::current("test");
        let result = thread::spawn(move || affinity.check()).join();
        assert!(result.is_err());
    }
}
