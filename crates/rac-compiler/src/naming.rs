//! Throwaway class names.
//!
//! Names are a prefix followed by uniformly random `A-Z0-9` characters, so
//! concurrent compilers never need to coordinate to stay out of each
//! other's way.

use rand::Rng;

/// Maximum length of an ABAP global class name.
pub const NAME_LENGTH_MAX: usize = 30;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a fresh class name using the thread-local RNG.
#[must_use]
pub fn generate(prefix: &str) -> String {
    generate_with(&mut rand::thread_rng(), prefix)
}

/// Generate a fresh class name from the given RNG.
///
/// The random part fills the name up to [`NAME_LENGTH_MAX`] characters.
/// The prefix is uppercased, as the server stores class names in uppercase.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, prefix: &str) -> String {
    let random_len = NAME_LENGTH_MAX.saturating_sub(prefix.chars().count());
    let mut name = String::with_capacity(NAME_LENGTH_MAX);
    name.push_str(&prefix.to_ascii_uppercase());
    for _ in 0..random_len {
        let index = rng.gen_range(0..CHARSET.len());
        name.push(char::from(CHARSET[index]));
    }
    name
}

/// ADT URI of a global class.
#[must_use]
pub fn class_url(class_name: &str) -> String {
    format!("/sap/bc/adt/oo/classes/{}", class_name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use rac_sim::DeterministicRng;

    #[test]
    fn test_length_and_alphabet() {
        let name = generate("RAC_");
        assert_eq!(name.len(), NAME_LENGTH_MAX);
        assert!(name.starts_with("RAC_"));
        assert!(name[4..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_lowercase_prefix_is_uppercased() {
        let name = generate("rac_");
        assert!(name.starts_with("RAC_"));
        assert_eq!(name, name.to_ascii_uppercase());
    }

    #[test]
    fn test_prefix_longer_than_budget() {
        let prefix = "Z".repeat(35);
        assert_eq!(generate(&prefix), prefix);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let mut rng1 = DeterministicRng::new(42);
        let mut rng2 = DeterministicRng::new(42);
        assert_eq!(generate_with(&mut rng1, "RAC_"), generate_with(&mut rng2, "RAC_"));
    }

    #[test]
    fn test_no_collisions() {
        let names: HashSet<String> = (0..10_000).map(|_| generate("RAC_")).collect();
        assert_eq!(names.len(), 10_000);
    }

    #[test]
    fn test_class_url() {
        assert_eq!(class_url("RAC_ABC"), "/sap/bc/adt/oo/classes/rac_abc");
    }
}
