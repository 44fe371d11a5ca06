// Nanoid-based unique identifiers for all stored rows.

/// Generate a unique ID using nanoid (21 characters).
pub fn generate_id() -> String {
    nanoid::nanoid!()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_length() {
        let id = generate_id();
        assert_eq!(id.len(), 21);
    }

    #[test]
    fn test_ids_are_unique() {
        let id1 = generate_id();
        let id2 = generate_id();
        assert_ne!(id1, id2);
    }
}
