use crate::scene::{EntityRef, SceneContext, SceneItem};
use std::fmt;

type Listener = Box<dyn FnMut(&[EntityRef])>;

/// Ordered, de-duplicated set of selected entities.
///
/// Listeners run synchronously after each effective mutation and see the
/// post-mutation contents. No-op calls never notify.
#[derive(Default)]
pub struct SelectionSet {
    items: Vec<EntityRef>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionSet")
            .field("items", &self.items)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&[EntityRef]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn add(&mut self, entity: EntityRef) -> bool {
        if self.items.contains(&entity) {
            return false;
        }
        self.items.push(entity);
        self.notify();
        true
    }

    /// Make `entity` the only selected item with a single notification.
    /// Returns `false` when it already was.
    pub fn replace(&mut self, entity: EntityRef) -> bool {
        if self.items == [entity] {
            return false;
        }
        self.items.clear();
        self.items.push(entity);
        self.notify();
        true
    }

    /// Insert every absent entity, then notify once. Returns how many were added.
    pub fn add_many<I>(&mut self, entities: I) -> usize
    where
        I: IntoIterator<Item = EntityRef>,
    {
        let before = self.items.len();
        for entity in entities {
            if !self.items.contains(&entity) {
                self.items.push(entity);
            }
        }
        let added = self.items.len() - before;
        if added > 0 {
            self.notify();
        }
        added
    }

    pub fn remove(&mut self, entity: EntityRef) -> bool {
        let Some(index) = self.items.iter().position(|e| *e == entity) else {
            return false;
        };
        self.items.remove(index);
        self.notify();
        true
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.notify();
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.items.contains(&entity)
    }

    pub fn get(&self, index: usize) -> Option<EntityRef> {
        self.items.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<EntityRef> {
        self.items.first().copied()
    }

    pub fn items(&self) -> &[EntityRef] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.items.iter().copied()
    }

    fn notify(&mut self) {
        for listener in &mut self.listeners {
            listener(&self.items);
        }
    }
}

/// First selected entity still present in `scene`.
pub fn first_resolved<'a>(selection: &[EntityRef], scene: &'a SceneContext) -> Option<&'a SceneItem> {
    selection.iter().find_map(|entity| scene.get(*entity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Category, EntityId};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn entity(id: u32) -> EntityRef {
        EntityRef::new(Category::SetObject, EntityId(id))
    }

    fn counted() -> (SelectionSet, Rc<RefCell<Vec<usize>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut set = SelectionSet::new();
        let sink = Rc::clone(&seen);
        set.subscribe(move |items| sink.borrow_mut().push(items.len()));
        (set, seen)
    }

    #[test]
    fn add_is_idempotent_and_notifies_once() {
        let (mut set, seen) = counted();
        assert!(set.add(entity(1)));
        assert!(!set.add(entity(1)));
        assert_eq!(set.len(), 1);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn bulk_add_notifies_once_after_all_insertions() {
        let (mut set, seen) = counted();
        set.add(entity(2));
        let added = set.add_many([entity(1), entity(2), entity(3), entity(1)]);
        assert_eq!(added, 2);
        assert_eq!(set.items(), &[entity(2), entity(1), entity(3)]);
        assert_eq!(*seen.borrow(), vec![1, 3]);

        assert_eq!(set.add_many([entity(3)]), 0);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn clear_notifies_only_when_non_empty() {
        let (mut set, seen) = counted();
        set.clear();
        assert!(seen.borrow().is_empty());
        set.add_many([entity(1), entity(2)]);
        set.clear();
        assert!(set.is_empty());
        assert_eq!(*seen.borrow(), vec![2, 0]);
    }

    #[test]
    fn replace_notifies_once() {
        let (mut set, seen) = counted();
        set.add_many([entity(1), entity(2)]);
        assert!(set.replace(entity(3)));
        assert_eq!(set.items(), &[entity(3)]);
        assert!(!set.replace(entity(3)));
        assert_eq!(*seen.borrow(), vec![2, 1]);
    }

    #[test]
    fn remove_absent_entity_is_silent() {
        let (mut set, seen) = counted();
        set.add(entity(4));
        assert!(!set.remove(entity(5)));
        assert!(set.remove(entity(4)));
        assert!(!set.contains(entity(4)));
        assert_eq!(*seen.borrow(), vec![1, 0]);
    }

    #[test]
    fn order_and_indexing_follow_insertion() {
        let mut set = SelectionSet::new();
        set.add(entity(9));
        set.add(entity(3));
        assert_eq!(set.first(), Some(entity(9)));
        assert_eq!(set.get(1), Some(entity(3)));
        assert_eq!(set.get(2), None);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![entity(9), entity(3)]);
    }
}
