use std::collections::HashMap;

/// Device id to desired display name, in first-seen order.
///
/// Inserting an id that is already present replaces its name but keeps its
/// original position, so iteration order only depends on where each device
/// first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMapping {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl RenameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name for `device_id`, returning the name it replaced
    pub fn insert(&mut self, device_id: String, name: String) -> Option<String> {
        match self.index.get(&device_id) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, name)),
            None => {
                self.index.insert(device_id.clone(), self.entries.len());
                self.entries.push((device_id, name));
                None
            }
        }
    }

    pub fn get(&self, device_id: &str) -> Option<&str> {
        self.index
            .get(device_id)
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(device_id, name)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }
}

impl FromIterator<(String, String)> for RenameMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (device_id, name) in iter {
            mapping.insert(device_id, name);
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_position() {
        let mut mapping = RenameMapping::new();
        assert_eq!(mapping.insert("a".into(), "One".into()), None);
        assert_eq!(mapping.insert("b".into(), "Two".into()), None);
        assert_eq!(
            mapping.insert("a".into(), "Three".into()),
            Some("One".to_string())
        );

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("a"), Some("Three"));
        let pairs: Vec<_> = mapping.iter().collect();
        assert_eq!(pairs, vec![("a", "Three"), ("b", "Two")]);
    }

    #[test]
    fn test_empty() {
        let mapping = RenameMapping::new();
        assert!(mapping.is_empty());
        assert_eq!(mapping.get("a"), None);
        assert_eq!(mapping.iter().count(), 0);
    }
}
