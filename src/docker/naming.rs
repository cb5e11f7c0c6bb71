use uuid::Uuid;

pub const INSTANCE_PREFIX: &str = "octoprint-";

/// Runtime container name for a record. Injective: distinct ids always give
/// distinct names, since the prefix is fixed and the id is rendered in its
/// canonical hyphenated form.
pub fn derive_instance_name(id: &Uuid) -> String {
    format!("{INSTANCE_PREFIX}{}", id.hyphenated())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn prefixes_the_identity() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            derive_instance_name(&id),
            "octoprint-67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
    }

    #[test]
    fn distinct_ids_give_distinct_names() {
        let names: HashSet<String> = (0..256)
            .map(|_| derive_instance_name(&Uuid::new_v4()))
            .collect();
        assert_eq!(names.len(), 256);
    }
}
