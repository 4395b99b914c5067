use uuid::Uuid;

/// Source of fresh identifiers for recipes and for ingredient/direction lines.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::IdGenerator;

    /// Predictable ids (`prefix-1`, `prefix-2`, ...) for assertions on line keys.
    #[derive(Debug)]
    pub struct SequentialIds {
        prefix: &'static str,
        next: AtomicU64,
    }

    impl SequentialIds {
        pub fn new(prefix: &'static str) -> Self {
            Self {
                prefix,
                next: AtomicU64::new(1),
            }
        }
    }

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::Relaxed);
            format!("{}-{n}", self.prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn uuid_generator_never_repeats() {
        let ids = UuidGenerator;
        let seen: HashSet<String> = (0..512).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 512);
    }
}
