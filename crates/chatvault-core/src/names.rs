//! Sender name equivalence

/// Spellings known to refer to the same identity
const ALIAS_GROUPS: &[&[&str]] = &[
    &["محمد", "mohamed", "mohammad", "mhd", "mohammed"],
    &["أحمد", "ahmed", "ahmad"],
    &["ملك", "malak", "melo"],
    &["سارة", "sara", "sarah"],
    &["علي", "ali"],
    &["chatgpt", "assistant", "gpt", "ai"],
];

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Canonical alias group index for a name, if it belongs to one
fn alias_group(name: &str) -> Option<usize> {
    let n = normalize(name);
    ALIAS_GROUPS.iter().position(|group| group.contains(&n.as_str()))
}

/// Whether two sender strings likely name the same person
///
/// Equal after trimming and lowercasing, members of the same alias group, or
/// one contained in the other.
pub fn is_same_person(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return true;
    }
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if let (Some(x), Some(y)) = (alias_group(&a), alias_group(&b)) {
        if x == y {
            return true;
        }
    }
    a.contains(&b) || b.contains(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_case() {
        assert!(is_same_person("Alice", " alice "));
        assert!(!is_same_person("Alice", "Bob"));
    }

    #[test]
    fn test_alias_groups() {
        assert!(is_same_person("Mohamed", "محمد"));
        assert!(is_same_person("MHD", "mohammad"));
        assert!(is_same_person("ChatGPT", "assistant"));
        assert!(!is_same_person("sara", "ali"));
        assert_eq!(alias_group("Sarah"), alias_group("سارة"));
    }

    #[test]
    fn test_containment() {
        assert!(is_same_person("Sam", "Sam Smith"));
        assert!(!is_same_person("", "Sam"));
    }
}
