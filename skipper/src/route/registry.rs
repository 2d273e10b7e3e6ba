//! Name -> spec lookup for predicates and filters (C2), populated once at
//! process init from `crate::predicates::builtin` / `crate::filters::builtin`
//! and treated as read-only after that (unknown names during table build
//! produce a build-time diagnostic on the offending route only).

use std::collections::HashMap;
use std::sync::Arc;

use super::filter::FilterSpec;
use super::predicate::PredicateSpec;

#[derive(Default)]
pub struct PredicateRegistry {
    specs: HashMap<String, Arc<dyn PredicateSpec>>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: Arc<dyn PredicateSpec>) {
        let name = spec.name().to_string();
        if self.specs.insert(name.clone(), spec).is_some() {
            tracing::warn!(predicate = %name, "predicate spec overwritten");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn PredicateSpec>> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }
}

#[derive(Default)]
pub struct FilterRegistry {
    specs: HashMap<String, Arc<dyn FilterSpec>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: Arc<dyn FilterSpec>) {
        let name = spec.name().to_string();
        if self.specs.insert(name.clone(), spec).is_some() {
            tracing::warn!(filter = %name, "filter spec overwritten");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FilterSpec>> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::predicate::{Predicate, RequestInfo};
    use crate::route::value::Value;

    struct AlwaysTrue;
    impl Predicate for AlwaysTrue {
        fn matches(&self, _req: &RequestInfo<'_>) -> bool {
            true
        }
    }

    struct AlwaysTrueSpec;
    impl PredicateSpec for AlwaysTrueSpec {
        fn name(&self) -> &str {
            "True"
        }
        fn create(
            &self,
            _args: &[Value],
        ) -> Result<Box<dyn Predicate>, crate::route::predicate::PredicateError> {
            Ok(Box::new(AlwaysTrue))
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = PredicateRegistry::new();
        assert!(!registry.contains("True"));

        registry.register(Arc::new(AlwaysTrueSpec));
        assert!(registry.contains("True"));
        assert!(registry.get("True").is_some());
        assert!(registry.get("Missing").is_none());
    }
}
