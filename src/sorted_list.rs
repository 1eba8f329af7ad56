//! Ordered, deduplicated sequence with a diffing synchronize-to-target
//! primitive.
//!
//! The list keeps its items sorted under a caller-supplied strict total
//! order and reports every structural change through [`ListEvent`]s, so an
//! observer (typically a tree view adapter) can mirror the list without
//! rescanning it.

use std::cmp::Ordering;
use std::sync::Arc;

/// The comparator defining the list order.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Structural change notification emitted by mutating operations.
///
/// Events carry enough data to replay the mutation against a mirror of the
/// pre-state: applying them in order reproduces the post-state.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent<T> {
    /// Items were inserted at the given indices, in ascending index order.
    /// Each index is the position at its own insertion time, so replaying
    /// the insertions one by one is position-exact.
    Inserted { indices: Vec<usize>, items: Vec<T> },
    /// Items were removed from the given indices, in descending index
    /// order (indices refer to the pre-removal state at each step).
    Removed { indices: Vec<usize>, items: Vec<T> },
    /// A previously empty list was filled with the given items, in order.
    BulkAdded { items: Vec<T> },
    /// The whole list content was removed; `items` is the outgoing content
    /// in its former order.
    Cleared { items: Vec<T> },
}

/// A sorted list of distinct items which can be continuously adapted to a
/// target state.
///
/// Membership queries run in `O(log n)`. Mutating operations accept an
/// event sink; handlers receive immutable snapshots and must not call back
/// into the list they observe.
pub struct SortedDistinctList<T> {
    items: Vec<T>,
    compare: Comparator<T>,
}

impl<T: Clone + Ord> SortedDistinctList<T> {
    /// Creates an empty list ordered by the natural order of `T`.
    pub fn natural_order() -> Self {
        Self::new(Arc::new(|a: &T, b: &T| a.cmp(b)))
    }
}

impl<T: Clone> SortedDistinctList<T> {
    /// Creates an empty list ordered by the given comparator.
    pub fn new(compare: Comparator<T>) -> Self {
        Self {
            items: Vec::new(),
            compare,
        }
    }

    /// Returns the configured comparator.
    pub fn comparator(&self) -> &Comparator<T> {
        &self.compare
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Binary search for the given item under the configured order.
    pub fn search(&self, item: &T) -> Result<usize, usize> {
        self.items.binary_search_by(|probe| (self.compare)(probe, item))
    }

    /// Binary search by an arbitrary key projection consistent with the
    /// list order.
    pub fn search_by<F>(&self, f: F) -> Result<usize, usize>
    where
        F: FnMut(&T) -> Ordering,
    {
        self.items.binary_search_by(f)
    }

    /// Returns true iff the item is contained in the list.
    pub fn contains_item(&self, item: &T) -> bool {
        self.search(item).is_ok()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Inserts the item in sort order if it is not already present.
    ///
    /// Emits a single-index [`ListEvent::Inserted`] when the list changed.
    /// Returns whether the list changed.
    pub fn add(&mut self, item: T, events: &mut dyn FnMut(ListEvent<T>)) -> bool {
        match self.search(&item) {
            Ok(_) => false,
            Err(insertion_point) => {
                self.items.insert(insertion_point, item.clone());
                events(ListEvent::Inserted {
                    indices: vec![insertion_point],
                    items: vec![item],
                });
                true
            }
        }
    }

    /// Adds every item of the collection in sort order.
    ///
    /// Filling an empty list behaves like a synchronize (one
    /// [`ListEvent::BulkAdded`]); otherwise each new item emits its own
    /// single-index insert. Returns whether the list changed.
    pub fn add_all(&mut self, items: Vec<T>, events: &mut dyn FnMut(ListEvent<T>)) -> bool {
        if self.items.is_empty() {
            let was_empty_input = items.is_empty();
            self.synchronize_to(items, events);
            !was_empty_input
        } else {
            let mut changed = false;
            for item in items {
                changed |= self.add(item, events);
            }
            changed
        }
    }

    /// Removes the given item if present, locating it by binary search.
    ///
    /// Emits a single-index [`ListEvent::Removed`] when the list changed.
    /// Returns whether the list changed.
    pub fn remove_item(&mut self, item: &T, events: &mut dyn FnMut(ListEvent<T>)) -> bool {
        match self.search(item) {
            Ok(index) => {
                let removed = self.items.remove(index);
                events(ListEvent::Removed {
                    indices: vec![index],
                    items: vec![removed],
                });
                true
            }
            Err(_) => false,
        }
    }

    /// Removes the item matched by the key projection, if any.
    pub fn remove_by<F>(&mut self, f: F, events: &mut dyn FnMut(ListEvent<T>)) -> bool
    where
        F: FnMut(&T) -> Ordering,
    {
        match self.search_by(f) {
            Ok(index) => {
                let removed = self.items.remove(index);
                events(ListEvent::Removed {
                    indices: vec![index],
                    items: vec![removed],
                });
                true
            }
            Err(_) => false,
        }
    }

    /// Replaces the list content with the given target collection.
    ///
    /// The target is sorted and deduplicated under the list comparator
    /// first. Event emission:
    ///
    /// - empty list, non-empty target: one [`ListEvent::BulkAdded`] with
    ///   all items in target order;
    /// - non-empty list, empty target: one [`ListEvent::Cleared`] carrying
    ///   the outgoing items;
    /// - otherwise: one [`ListEvent::Removed`] with the indices of vanished
    ///   items in descending order, then one [`ListEvent::Inserted`] with
    ///   the post-deletion insertion indices in ascending order. Either
    ///   event is omitted when it would be empty.
    pub fn synchronize_to(&mut self, target: Vec<T>, events: &mut dyn FnMut(ListEvent<T>)) {
        let target = self.sorted_distinct(target);
        if self.items.is_empty() {
            if !target.is_empty() {
                self.items = target.clone();
                events(ListEvent::BulkAdded { items: target });
            }
        } else if target.is_empty() {
            let outgoing = std::mem::take(&mut self.items);
            events(ListEvent::Cleared { items: outgoing });
        } else {
            // Deletions first, walking backwards so indices stay valid.
            let mut removed_indices = Vec::new();
            let mut removed_items = Vec::new();
            for i in (0..self.items.len()).rev() {
                let absent = target
                    .binary_search_by(|probe| (self.compare)(probe, &self.items[i]))
                    .is_err();
                if absent {
                    removed_items.push(self.items.remove(i));
                    removed_indices.push(i);
                }
            }
            if !removed_indices.is_empty() {
                events(ListEvent::Removed {
                    indices: removed_indices,
                    items: removed_items,
                });
            }
            // Then insertions, in ascending target order.
            let mut inserted_indices = Vec::new();
            let mut inserted_items = Vec::new();
            for item in target {
                if let Err(insertion_point) = self.search(&item) {
                    self.items.insert(insertion_point, item.clone());
                    inserted_indices.push(insertion_point);
                    inserted_items.push(item);
                }
            }
            if !inserted_indices.is_empty() {
                events(ListEvent::Inserted {
                    indices: inserted_indices,
                    items: inserted_items,
                });
            }
        }
    }

    /// Removes all items; equivalent to synchronizing to an empty target.
    pub fn clear(&mut self, events: &mut dyn FnMut(ListEvent<T>)) {
        self.synchronize_to(Vec::new(), events);
    }

    /// Consumes the list, returning its items in order.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    fn sorted_distinct(&self, mut input: Vec<T>) -> Vec<T> {
        input.sort_by(|a, b| (self.compare)(a, b));
        input.dedup_by(|a, b| (self.compare)(a, b) == Ordering::Equal);
        input
    }
}

impl<'a, T: Clone> IntoIterator for &'a SortedDistinctList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for SortedDistinctList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

/// Sink that drops all events, for callers not interested in tracking.
pub fn ignore_events<T>(_: ListEvent<T>) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn natural() -> Comparator<String> {
        Arc::new(|a: &String, b: &String| a.cmp(b))
    }

    fn reverse() -> Comparator<String> {
        Arc::new(|a: &String, b: &String| b.cmp(a))
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn collect_events(
        list: &mut SortedDistinctList<String>,
        target: &[&str],
    ) -> Vec<ListEvent<String>> {
        let mut events = Vec::new();
        list.synchronize_to(strings(target), &mut |e| events.push(e));
        events
    }

    #[test]
    fn test_add_keeps_sort_order_and_reports_index() {
        let mut list = SortedDistinctList::new(natural());
        let mut events = Vec::new();
        assert!(list.add("m".to_string(), &mut |e| events.push(e)));
        assert!(list.add("a".to_string(), &mut |e| events.push(e)));
        assert!(list.add("z".to_string(), &mut |e| events.push(e)));
        assert_eq!(list.as_slice(), &strings(&["a", "m", "z"])[..]);
        assert_eq!(
            events,
            vec![
                ListEvent::Inserted { indices: vec![0], items: strings(&["m"]) },
                ListEvent::Inserted { indices: vec![0], items: strings(&["a"]) },
                ListEvent::Inserted { indices: vec![2], items: strings(&["z"]) },
            ]
        );
    }

    #[test]
    fn test_add_duplicate_is_rejected() {
        let mut list = SortedDistinctList::new(natural());
        list.add("a".to_string(), &mut ignore_events);
        let mut fired = false;
        assert!(!list.add("a".to_string(), &mut |_| fired = true));
        assert!(!fired);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_item_reports_former_index() {
        let mut list = SortedDistinctList::new(natural());
        list.synchronize_to(strings(&["a", "b", "c"]), &mut ignore_events);
        let mut events = Vec::new();
        assert!(list.remove_item(&"b".to_string(), &mut |e| events.push(e)));
        assert_eq!(
            events,
            vec![ListEvent::Removed { indices: vec![1], items: strings(&["b"]) }]
        );
        assert!(!list.remove_item(&"b".to_string(), &mut ignore_events));
    }

    #[test]
    fn test_synchronize_fills_empty_list_with_bulk_add() {
        let mut list = SortedDistinctList::new(natural());
        let events = collect_events(&mut list, &["b", "a", "b"]);
        assert_eq!(
            events,
            vec![ListEvent::BulkAdded { items: strings(&["a", "b"]) }]
        );
        assert_eq!(list.as_slice(), &strings(&["a", "b"])[..]);
    }

    #[test]
    fn test_synchronize_to_empty_emits_clear_with_outgoing_items() {
        let mut list = SortedDistinctList::new(natural());
        list.synchronize_to(strings(&["a", "b"]), &mut ignore_events);
        let events = collect_events(&mut list, &[]);
        assert_eq!(
            events,
            vec![ListEvent::Cleared { items: strings(&["a", "b"]) }]
        );
        assert!(list.is_empty());
    }

    #[test]
    fn test_mixed_synchronize_under_reverse_comparator() {
        // The literal diff scenario: start ["c","e","g"] reversed,
        // grow to five items, shrink to two, then clear.
        let mut list = SortedDistinctList::new(reverse());
        list.synchronize_to(strings(&["c", "e", "g"]), &mut ignore_events);
        assert_eq!(list.as_slice(), &strings(&["g", "e", "c"])[..]);

        let events = collect_events(&mut list, &["a", "c", "e", "g", "i"]);
        assert_eq!(
            events,
            vec![ListEvent::Inserted {
                indices: vec![0, 4],
                items: strings(&["i", "a"]),
            }]
        );
        assert_eq!(list.as_slice(), &strings(&["i", "g", "e", "c", "a"])[..]);

        let events = collect_events(&mut list, &["c", "g"]);
        assert_eq!(
            events,
            vec![ListEvent::Removed {
                indices: vec![4, 2, 0],
                items: strings(&["a", "e", "i"]),
            }]
        );
        assert_eq!(list.as_slice(), &strings(&["g", "c"])[..]);

        let events = collect_events(&mut list, &[]);
        assert_eq!(
            events,
            vec![ListEvent::Cleared { items: strings(&["g", "c"]) }]
        );
    }

    #[test]
    fn test_mixed_synchronize_emits_removes_before_inserts() {
        let mut list = SortedDistinctList::new(natural());
        list.synchronize_to(strings(&["b", "d", "f"]), &mut ignore_events);
        let events = collect_events(&mut list, &["a", "d", "g"]);
        assert_eq!(
            events,
            vec![
                ListEvent::Removed { indices: vec![2, 0], items: strings(&["f", "b"]) },
                ListEvent::Inserted { indices: vec![0, 2], items: strings(&["a", "g"]) },
            ]
        );
        assert_eq!(list.as_slice(), &strings(&["a", "d", "g"])[..]);
    }

    /// Replaying the emitted events against a plain vector mirror must
    /// reproduce the post-state, whatever the sequence of targets.
    #[test]
    fn test_event_replay_reproduces_post_state() {
        let targets: Vec<Vec<&str>> = vec![
            vec!["d", "b", "f"],
            vec!["a", "b", "c", "d", "e"],
            vec!["e"],
            vec![],
            vec!["x", "y"],
            vec!["x", "y", "a", "m"],
        ];
        let mut list = SortedDistinctList::new(natural());
        let mut mirror: Vec<String> = Vec::new();
        for target in targets {
            list.synchronize_to(strings(&target), &mut |event| match event {
                ListEvent::Inserted { indices, items } => {
                    for (i, item) in indices.into_iter().zip(items) {
                        mirror.insert(i, item);
                    }
                }
                ListEvent::Removed { indices, items } => {
                    for (i, item) in indices.into_iter().zip(items) {
                        assert_eq!(mirror.remove(i), item);
                    }
                }
                ListEvent::BulkAdded { items } => {
                    assert!(mirror.is_empty());
                    mirror.extend(items);
                }
                ListEvent::Cleared { items } => {
                    assert_eq!(mirror, items);
                    mirror.clear();
                }
            });
            assert_eq!(mirror, list.as_slice(), "mirror diverged from list");
            let mut expected = strings(&target);
            expected.sort();
            expected.dedup();
            assert_eq!(list.as_slice(), &expected[..]);
        }
    }

    #[test]
    fn test_add_all_bulk_fills_empty_list() {
        let mut list = SortedDistinctList::new(reverse());
        let mut events = Vec::new();
        assert!(!list.add_all(Vec::new(), &mut |e| events.push(e)));
        assert!(events.is_empty());

        assert!(list.add_all(strings(&["3", "1", "2"]), &mut |e| events.push(e)));
        assert_eq!(
            events,
            vec![ListEvent::BulkAdded { items: strings(&["3", "2", "1"]) }]
        );
    }

    #[test]
    fn test_add_all_into_non_empty_list_adds_one_by_one() {
        let mut list = SortedDistinctList::new(reverse());
        list.add_all(strings(&["3", "1", "2"]), &mut ignore_events);

        let mut events = Vec::new();
        assert!(!list.add_all(strings(&["3", "1"]), &mut |e| events.push(e)));
        assert!(events.is_empty());

        assert!(list.add_all(strings(&["3", "1", "2", "4"]), &mut |e| events.push(e)));
        assert_eq!(
            events,
            vec![ListEvent::Inserted { indices: vec![0], items: strings(&["4"]) }]
        );
        assert_eq!(list.as_slice(), &strings(&["4", "3", "2", "1"])[..]);
    }

    #[test]
    fn test_synchronize_to_current_content_emits_nothing() {
        let mut list = SortedDistinctList::new(natural());
        list.synchronize_to(strings(&["a", "b"]), &mut ignore_events);
        let events = collect_events(&mut list, &["b", "a"]);
        assert!(events.is_empty());
        assert_eq!(list.as_slice(), &strings(&["a", "b"])[..]);
    }

    #[test]
    fn test_synchronize_empty_to_empty_emits_nothing() {
        let mut list: SortedDistinctList<String> = SortedDistinctList::new(natural());
        let mut fired = false;
        list.synchronize_to(Vec::new(), &mut |_| fired = true);
        assert!(!fired);
        assert!(list.is_empty());
    }

    #[test]
    fn test_duplicate_target_items_are_collapsed() {
        let mut list = SortedDistinctList::natural_order();
        list.synchronize_to(strings(&["3", "1", "2", "1"]), &mut ignore_events);
        assert_eq!(list.as_slice(), &strings(&["1", "2", "3"])[..]);
    }

    #[test]
    fn test_first_last_and_iteration() {
        let mut list = SortedDistinctList::new(natural());
        list.add_all(strings(&["b", "c", "a"]), &mut ignore_events);
        assert_eq!(list.first().map(String::as_str), Some("a"));
        assert_eq!(list.last().map(String::as_str), Some("c"));
        let collected: Vec<&String> = (&list).into_iter().collect();
        assert_eq!(collected.len(), 3);
        assert!(list.contains_item(&"b".to_string()));
        assert!(!list.contains_item(&"d".to_string()));
    }

    #[test]
    fn test_search_by_key_projection() {
        let mut list = SortedDistinctList::new(natural());
        list.synchronize_to(strings(&["alpha", "beta", "gamma"]), &mut ignore_events);
        assert_eq!(list.search_by(|s| s.as_str().cmp("beta")), Ok(1));
        assert!(list.search_by(|s| s.as_str().cmp("delta")).is_err());
    }
}
