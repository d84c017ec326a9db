/// Named, ordered collection of items. Scenes keep groups of entity ids that
/// colliders can target by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<T> {
    name: String,
    items: Vec<T>,
}

impl<T> Group<T> {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Self {
            name: name.as_ref().to_string(),
            items: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drops every item matching the predicate, returns how many went away.
    pub fn remove_where<F: FnMut(&T) -> bool>(&mut self, mut predicate: F) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !predicate(item));
        before - self.items.len()
    }
}

impl<T: PartialEq> Group<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Adds the item unless it is already a member.
    pub fn insert(&mut self, item: T) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, item: &T) -> bool {
        self.remove_where(|i| i == item) > 0
    }
}

impl<T: Clone> Group<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}

#[test]
fn test_group_membership() {
    let mut group = Group::new("solid");
    assert_eq!(group.name(), "solid");
    assert!(group.insert(3u32));
    assert!(group.insert(1));
    assert!(!group.insert(3));
    assert_eq!(group.to_vec(), vec![3, 1]);
    assert!(group.remove(&3));
    assert!(!group.remove(&3));
    assert_eq!(group.len(), 1);
}

#[test]
fn test_group_remove_where() {
    let mut group = Group::new("numbers");
    for i in 0..10u32 {
        group.add(i);
    }
    assert_eq!(group.remove_where(|i| i % 2 == 0), 5);
    assert_eq!(group.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5, 7, 9]);
}
