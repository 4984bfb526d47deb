use jcg_core::WarningCollector;

/// Shared, passed-in state every scan worker touches: a tracing span root to
/// scope child spans under, and the warning sink (Design Notes §9: shared
/// mutable state is an explicit object, never a global).
pub struct ScanContext {
    span: tracing::Span,
    warnings: WarningCollector,
}

impl ScanContext {
    pub fn new() -> Self {
        Self {
            span: tracing::info_span!("jcg_scan"),
            warnings: WarningCollector::new(),
        }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn warnings(&self) -> &WarningCollector {
        &self.warnings
    }

    pub fn into_warnings(self) -> WarningCollector {
        self.warnings
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new()
    }
}
