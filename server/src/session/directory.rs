use std::collections::HashMap;

/// Uniqueness key for a display name. Comparison is case-insensitive.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// Set of currently claimed display names, indexed by their normalized form.
#[derive(Debug, Default)]
pub struct NameDirectory {
    /// normalized name -> name as the user typed it
    claimed: HashMap<String, String>,
}

impl NameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`. Returns false, leaving the directory untouched, if any
    /// case-insensitive match is already claimed.
    pub fn claim(&mut self, name: &str) -> bool {
        let key = normalize(name);
        if self.claimed.contains_key(&key) {
            return false;
        }
        self.claimed.insert(key, name.to_string());
        true
    }

    pub fn release(&mut self, name: &str) -> bool {
        self.claimed.remove(&normalize(name)).is_some()
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    /// Claimed names in their original casing, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.claimed.values().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_case_insensitive() {
        let mut directory = NameDirectory::new();
        assert!(directory.claim("Alice"));
        assert!(!directory.claim("alice"));
        assert!(!directory.claim("ALICE"));
        assert!(!directory.claim("aLiCe"));
        assert_eq!(directory.names().collect::<Vec<_>>(), vec!["Alice"]);
    }

    #[test]
    fn test_release_frees_any_casing() {
        let mut directory = NameDirectory::new();
        directory.claim("Bob");
        assert!(directory.release("BOB"));
        assert!(!directory.release("bob"));
        assert!(directory.claim("bob"));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_unicode_case_folding() {
        let mut directory = NameDirectory::new();
        assert!(directory.claim("Ärger"));
        assert!(!directory.claim("ärger"));
    }
}
