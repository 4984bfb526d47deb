//! Non-fatal scan warnings.
//!
//! A warning never aborts a scan; it is collected alongside the result so a
//! caller can decide whether a malformed classfile or unreadable archive
//! entry matters for their use case (spec §7: warnings carry a class name, a
//! reason, and an optional byte offset, never a hard failure).

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WarningKind {
    /// A classfile failed to parse; the entry is skipped and excluded from
    /// the graph rather than aborting the whole scan.
    MalformedClassfile,
    /// An archive entry could not be read (corrupt central directory entry,
    /// truncated deflate stream, etc.).
    UnreadableEntry,
    /// A classpath element referenced in a manifest `Class-Path:` line or a
    /// wildcard glob could not be resolved to anything on disk.
    UnresolvedClasspathElement,
    /// A configuration value was accepted but is likely a mistake (e.g. an
    /// include prefix made redundant by another include).
    SuspiciousConfiguration,
    /// An `extends` cycle was detected among scanned classes. The cycle is
    /// tolerated (closures over it simply stop revisiting nodes) but is
    /// always a sign of a malformed or adversarially hand-assembled
    /// classfile set, since real `javac` output is never cyclic.
    CyclicExtends,
}

/// A single warning produced while scanning a classpath.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    /// Dotted class name the warning concerns, when known.
    pub class_name: Option<String>,
    pub reason: String,
    /// Byte offset into the classfile or archive entry where the problem was
    /// detected, when the originating parser tracked one.
    pub offset: Option<u64>,
}

impl Warning {
    pub fn new(kind: WarningKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            class_name: None,
            reason: reason.into(),
            offset: None,
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A thread-safe sink warnings are appended to during a scan.
///
/// Scan workers each hold a `&WarningCollector` (Design Notes §9: shared
/// mutable state is an explicit, passed-in object rather than a global).
#[derive(Default)]
pub struct WarningCollector {
    warnings: std::sync::Mutex<Vec<Warning>>,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, warning: Warning) {
        self.warnings
            .lock()
            .expect("warning collector mutex poisoned")
            .push(warning);
    }

    /// Drain all collected warnings, leaving the collector empty.
    pub fn drain(&self) -> Vec<Warning> {
        std::mem::take(
            &mut *self
                .warnings
                .lock()
                .expect("warning collector mutex poisoned"),
        )
    }

    pub fn into_inner(self) -> Vec<Warning> {
        self.warnings
            .into_inner()
            .expect("warning collector mutex poisoned")
    }

    pub fn is_empty(&self) -> bool {
        self.warnings
            .lock()
            .expect("warning collector mutex poisoned")
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_accumulates_across_pushes() {
        let collector = WarningCollector::new();
        collector.push(
            Warning::new(WarningKind::MalformedClassfile, "truncated constant pool")
                .with_class_name("com.example.Foo")
                .with_offset(128),
        );
        collector.push(Warning::new(WarningKind::UnreadableEntry, "bad crc"));

        let warnings = collector.into_inner();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].class_name.as_deref(), Some("com.example.Foo"));
        assert_eq!(warnings[0].offset, Some(128));
    }
}
