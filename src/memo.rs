use std::cell::RefCell;

/// Single-slot cache for a derived view.
///
/// The key must capture every input that affects the value; a hit returns a
/// clone of the stored value, a miss recomputes and replaces it. Dropping the
/// cache never changes results.
#[derive(Debug)]
pub struct Memo<K, V> {
    slot: RefCell<Option<(K, V)>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<K: PartialEq, V: Clone> Memo<K, V> {
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some((cached_key, value)) = self.slot.borrow().as_ref() {
            if *cached_key == key {
                tracing::trace!("Derived view served from cache");
                return value.clone();
            }
        }

        let value = compute();
        *self.slot.borrow_mut() = Some((key, value.clone()));
        value
    }

    pub fn invalidate(&self) {
        self.slot.borrow_mut().take();
    }
}
