//! local names for resources declared without one
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of names for top-level resources that were declared without a name
pub trait NameGenerator: Send + Sync + std::fmt::Debug {
    fn next_name(&self) -> String;
}

pub type SharedNames = Arc<dyn NameGenerator>;

/// `id_1`, `id_2`, ... in call order
#[derive(Debug, Default)]
pub struct SequentialNames {
    counter: AtomicUsize,
}

impl SequentialNames {
    pub fn shared() -> SharedNames {
        Arc::new(Self::default())
    }
}

impl NameGenerator for SequentialNames {
    fn next_name(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("id_{id}")
    }
}

/// `id_<uuid>`, unique across runs
#[derive(Debug, Default)]
pub struct RandomNames;

impl RandomNames {
    pub fn shared() -> SharedNames {
        Arc::new(Self)
    }
}

impl NameGenerator for RandomNames {
    fn next_name(&self) -> String {
        format!("id_{}", uuid::Uuid::new_v4().simple())
    }
}
