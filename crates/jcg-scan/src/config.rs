use jcg_core::{Warning, WarningCollector, WarningKind};

use crate::error::{Result, ScanError};

/// Typed scan configuration, validated once at construction rather than
/// threaded through as loose arguments (mirrors the teacher's
/// `IndexOptions` pattern).
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub include_packages: Vec<String>,
    pub exclude_packages: Vec<String>,
    pub include_classes: Vec<String>,
    pub exclude_classes: Vec<String>,
    pub exclude_system_archives: bool,
    pub retain_external_references: bool,
    /// Thread-pool size; `0` means let `rayon` pick based on available
    /// parallelism.
    pub worker_count: u32,
    /// Replaces the environment-derived classpath entirely when set.
    pub classpath_override: Option<String>,
    /// Feature release used to select `META-INF/versions/<n>` overlays in
    /// multi-release jars. `None` disables multi-release resolution.
    pub target_release: Option<u16>,
    /// Attempt memory-mapping for top-level archive/file slices instead of
    /// reading them fully into the heap.
    pub enable_memory_mapping: bool,
    pub parse_options: jcg_classfile::ParseOptions,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_packages: Vec::new(),
            exclude_packages: Vec::new(),
            include_classes: Vec::new(),
            exclude_classes: Vec::new(),
            exclude_system_archives: true,
            retain_external_references: true,
            worker_count: 0,
            classpath_override: None,
            target_release: None,
            enable_memory_mapping: true,
            parse_options: jcg_classfile::ParseOptions::default(),
        }
    }
}

impl ScanConfig {
    /// Rejects configurations that can never produce a sensible scan, and
    /// warns (without failing) about configurations that are merely
    /// suspicious.
    pub fn validate(&self, warnings: &WarningCollector) -> Result<()> {
        if self.target_release == Some(0) {
            return Err(ScanError::InvalidConfiguration(
                "target_release of 0 is invalid; JDK feature releases start at 1".to_string(),
            ));
        }

        if !self.include_packages.is_empty() || !self.include_classes.is_empty() {
            let include_fully_redundant = self
                .include_packages
                .iter()
                .all(|p| self.exclude_packages.iter().any(|e| e == p))
                && self
                    .include_classes
                    .iter()
                    .all(|c| self.exclude_classes.iter().any(|e| e == c) || self.exclude_packages.iter().any(|e| c.starts_with(&format!("{e}."))));
            if include_fully_redundant {
                warnings.push(Warning::new(
                    WarningKind::SuspiciousConfiguration,
                    "every include_packages/include_classes entry is also excluded; the include list has no effect".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn filter(&self) -> jcg_graph::Filter {
        jcg_graph::Filter {
            include_packages: self.include_packages.clone(),
            exclude_packages: self.exclude_packages.clone(),
            include_classes: self.include_classes.clone(),
            exclude_classes: self.exclude_classes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_target_release_zero() {
        let config = ScanConfig {
            target_release: Some(0),
            ..Default::default()
        };
        let warnings = WarningCollector::new();
        assert!(config.validate(&warnings).is_err());
    }

    #[test]
    fn warns_when_include_list_is_wholly_redundant() {
        let config = ScanConfig {
            include_packages: vec!["p".to_string()],
            exclude_packages: vec!["p".to_string()],
            ..Default::default()
        };
        let warnings = WarningCollector::new();
        assert!(config.validate(&warnings).is_ok());
        assert_eq!(warnings.into_inner().len(), 1);
    }

    #[test]
    fn accepts_default_configuration() {
        let config = ScanConfig::default();
        let warnings = WarningCollector::new();
        assert!(config.validate(&warnings).is_ok());
        assert!(warnings.is_empty());
    }
}
