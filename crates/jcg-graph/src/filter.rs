//! Accept/reject decisions for class names against include/exclude rules.
//!
//! This is the `Filter` named in the component table: a pure decision
//! function over a dotted class name, used by a scan driver to decide
//! whether a parsed class becomes a graph node at all (P4: no name matching
//! `exclude_*` ever appears as a node key) and, separately, whether
//! unresolved references to such names should still show up as dangling
//! targets (`RelationshipLinker::with_retain_external_references`).

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub include_packages: Vec<String>,
    pub exclude_packages: Vec<String>,
    pub include_classes: Vec<String>,
    pub exclude_classes: Vec<String>,
}

impl Filter {
    /// Whether `name` survives this filter. Exclude always wins over
    /// include on overlap; an empty include list means "everything not
    /// excluded is retained".
    pub fn accepts(&self, name: &str) -> bool {
        if self.exclude_classes.iter().any(|c| c == name) {
            return false;
        }
        if self.exclude_packages.iter().any(|p| is_under_package(name, p)) {
            return false;
        }
        if self.include_classes.is_empty() && self.include_packages.is_empty() {
            return true;
        }
        self.include_classes.iter().any(|c| c == name)
            || self.include_packages.iter().any(|p| is_under_package(name, p))
    }
}

/// `package` is a dotted prefix; `name` is under it if `name` is exactly
/// `package` or starts with `package.`.
fn is_under_package(name: &str, package: &str) -> bool {
    name == package || name.starts_with(&format!("{package}."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_wins_over_include_on_overlap() {
        let filter = Filter {
            include_packages: vec!["java".to_string()],
            exclude_packages: vec!["java.lang".to_string()],
            ..Default::default()
        };
        assert!(!filter.accepts("java.lang.Object"));
        assert!(filter.accepts("java.util.List"));
    }

    #[test]
    fn empty_include_list_retains_everything_not_excluded() {
        let filter = Filter {
            exclude_packages: vec!["java".to_string()],
            ..Default::default()
        };
        assert!(filter.accepts("p.A"));
        assert!(!filter.accepts("java.Foo"));
    }

    #[test]
    fn exact_class_rules_do_not_match_siblings() {
        let filter = Filter {
            include_classes: vec!["p.A".to_string()],
            ..Default::default()
        };
        assert!(filter.accepts("p.A"));
        assert!(!filter.accepts("p.B"));
    }
}
