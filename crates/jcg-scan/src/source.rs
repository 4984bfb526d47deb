//! Pluggable classpath sources (spec §6's "classloader adapter" extension
//! point, re-architected as an opaque string-producing contract instead of
//! runtime reflection).

/// Contributes zero or more raw classpath entries, in order. The core
/// consults sources in a fixed order and never inspects one beyond this
/// contract.
pub trait ClasspathSource {
    fn entries(&self) -> Vec<String>;
}

/// Reads the process's `CLASSPATH` environment variable, splitting on the
/// platform path separator. The default source consulted when a scan has no
/// `classpath_override` and no caller-registered sources.
pub struct EnvironmentClasspathSource;

impl ClasspathSource for EnvironmentClasspathSource {
    fn entries(&self) -> Vec<String> {
        let separator = if cfg!(windows) { ';' } else { ':' };
        std::env::var("CLASSPATH")
            .ok()
            .map(|raw| {
                raw.split(separator)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A fixed list of entries, useful for `classpath_override` and for tests.
pub struct StaticClasspathSource(pub Vec<String>);

impl ClasspathSource for StaticClasspathSource {
    fn entries(&self) -> Vec<String> {
        self.0.clone()
    }
}
