//! Deferred function walker set (C5, §4.5): a mapping from function
//! definition to a one-shot body-walker, drained with constructors first so
//! instance-attribute types are known before other methods' return types
//! are resolved.

use std::sync::Mutex;

use indexmap::IndexMap;

/// A function's body walk, captured as a closure over whatever the AST
/// walker needs (its private scope clone, its AST node, its `Overload`) and
/// run at most once. Boxed so the set can hold walkers for functions,
/// methods and properties uniformly.
pub type Walker = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct DeferredWalkerSet {
    entries: Mutex<IndexMap<String, (bool, Walker)>>,
}

impl DeferredWalkerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `add(w)` (§4.5): "registers or replaces." `key` should be the
    /// function's fully-qualified name so a redefinition (e.g. from a stub
    /// pass over the same file) naturally replaces the prior walker.
    /// `is_constructor` marks `__init__`/`__new__` for `process_set`'s
    /// ordering rule.
    pub fn add(&self, key: impl Into<String>, is_constructor: bool, walker: Walker) {
        self.entries.lock().unwrap().insert(key.into(), (is_constructor, walker));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// `process_function(fd)` (§4.5): drains only the named entry, if
    /// present. Used by `expr_eval`'s Call-expression rule to force a
    /// function's return type on demand.
    pub fn process_function(&self, key: &str) {
        let entry = self.entries.lock().unwrap().shift_remove(key);
        if let Some((_, walker)) = entry {
            walker();
        }
    }

    /// `process_set()` (§4.5): drains constructors first ("so class-variable
    /// initialisation inside constructors happens before method return-type
    /// resolution depends on it"), then any remaining entry arbitrarily.
    /// Each entry is removed before its walker runs, so a walker that
    /// itself triggers another deferred walk (via `process_function`)
    /// cannot re-enter its own entry.
    pub fn process_set(&self) {
        loop {
            let next = {
                let mut entries = self.entries.lock().unwrap();
                let constructor_key = entries
                    .iter()
                    .find(|(_, (is_constructor, _))| *is_constructor)
                    .map(|(key, _)| key.clone());
                let key = constructor_key.or_else(|| entries.keys().next().cloned());
                key.and_then(|key| entries.shift_remove(&key).map(|(_, walker)| walker))
            };
            match next {
                Some(walker) => walker(),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn constructors_drain_before_other_methods() {
        let order = Arc::new(StdMutex::new(Vec::new()));
        let set = DeferredWalkerSet::new();

        let order_clone = order.clone();
        set.add("C.method", false, Box::new(move || order_clone.lock().unwrap().push("method")));
        let order_clone = order.clone();
        set.add("C.__init__", true, Box::new(move || order_clone.lock().unwrap().push("__init__")));

        set.process_set();

        assert_eq!(*order.lock().unwrap(), vec!["__init__", "method"]);
        assert!(set.is_empty());
    }

    #[test]
    fn process_function_removes_entry_before_invoking() {
        let set = DeferredWalkerSet::new();
        set.add("f", false, Box::new(|| {}));
        set.process_function("f");
        assert!(set.is_empty());
        // A second call finds nothing and is a safe no-op.
        set.process_function("f");
    }
}
