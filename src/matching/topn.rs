use std::fmt;

use uuid::Uuid;

/// Function mapping a candidate to its group name
pub type GroupBy<T> = Box<dyn Fn(&T) -> String>;

/// Identity of a candidate's group.
///
/// Without a `group_by` function every candidate gets a fresh random id, so
/// no two candidates ever share a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Unique(Uuid),
    Named(String),
}

#[derive(Debug, Clone)]
struct Entry<T> {
    group: GroupKey,
    value: T,
    score: f64,
}

/// Bounded best-candidate accumulator.
///
/// Keeps at most `capacity` candidates, at most one per group, and never the
/// same value twice. When full, a new group displaces the lowest-scoring entry
/// only if it scores strictly higher.
pub struct TopN<T> {
    capacity: usize,
    group_by: Option<GroupBy<T>>,
    entries: Vec<Entry<T>>,
}

impl<T: PartialEq + Clone> TopN<T> {
    /// Ungrouped accumulator: only exact-duplicate values are merged.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            group_by: None,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Accumulator that keeps one candidate per `group_by(value)`.
    pub fn with_group_by<F>(capacity: usize, group_by: F) -> Self
    where
        F: Fn(&T) -> String + 'static,
    {
        Self {
            capacity,
            group_by: Some(Box::new(group_by)),
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn group_of(&self, value: &T) -> GroupKey {
        match &self.group_by {
            Some(group_by) => GroupKey::Named(group_by(value)),
            None => GroupKey::Unique(Uuid::new_v4()),
        }
    }

    /// Offer a candidate. Returns `true` if it was retained.
    pub fn put(&mut self, value: T, score: f64) -> bool {
        let group = self.group_of(&value);

        if let Some(pos) = self.entries.iter().position(|e| e.group == group) {
            // Same group: replace only on a strictly better score, and never
            // with a value another group already holds.
            let duplicate_elsewhere = self
                .entries
                .iter()
                .enumerate()
                .any(|(i, e)| i != pos && e.value == value);
            if score > self.entries[pos].score && !duplicate_elsewhere {
                let entry = &mut self.entries[pos];
                entry.value = value;
                entry.score = score;
                return true;
            }
            return false;
        }

        if self.entries.iter().any(|e| e.value == value) {
            return false;
        }

        if self.entries.len() < self.capacity {
            self.entries.push(Entry {
                group,
                value,
                score,
            });
            return true;
        }

        match self.lowest() {
            Some(lowest) if score > self.entries[lowest].score => {
                self.entries.remove(lowest);
                self.entries.push(Entry {
                    group,
                    value,
                    score,
                });
                true
            }
            _ => false,
        }
    }

    // First entry (in insertion order) holding the minimum score.
    fn lowest(&self) -> Option<usize> {
        let mut lowest: Option<usize> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            match lowest {
                Some(l) if self.entries[l].score <= entry.score => {}
                _ => lowest = Some(i),
            }
        }
        lowest
    }

    /// All retained candidates. Order is not meaningful.
    pub fn get(&self) -> Vec<(T, f64)> {
        self.entries
            .iter()
            .map(|e| (e.value.clone(), e.score))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
        self.entries.iter().map(|e| (&e.value, e.score))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for TopN<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopN")
            .field("capacity", &self.capacity)
            .field("grouped", &self.group_by.is_some())
            .field("entries", &self.entries)
            .finish()
    }
}
