//! Turns a list of raw classpath entries (plain paths, `dir/*` wildcards,
//! and `outer.jar!inner.jar` nested-archive paths) into a deduplicated list
//! of [`ResourceRoot`]s, chasing `Class-Path:` manifest entries and
//! recording multi-release/module-hint metadata along the way.

mod error;
mod module_name;

use std::collections::{HashSet, VecDeque};
use std::io::Read;
use std::path::{Path, PathBuf};

use jcg_core::{RootId, Warning, WarningCollector, WarningKind};

pub use error::{ClasspathError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    Directory,
    Jar,
    Jmod,
    /// A `parent!segment[!segment...]` path into a nested archive. Opening
    /// one of these roots goes through `jcg_archive::NestedArchiveHandler`
    /// rather than the filesystem directly.
    Nested,
}

#[derive(Debug, Clone)]
pub struct ResourceRoot {
    pub id: RootId,
    pub kind: RootKind,
    pub path: PathBuf,
    /// Cosmetic only: the explicit or automatic JPMS module name, when one
    /// can be derived. Never participates in masking or graph construction.
    pub module_hint: Option<String>,
    pub is_system: bool,
    pub is_multi_release: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveConfig {
    /// Java feature release number used to pick `META-INF/versions/<n>`
    /// entries out of a multi-release JAR. `None` disables multi-release
    /// resolution entirely (every entry is treated as its base version).
    pub target_release: Option<u16>,
}

pub struct ClasspathResolver;

impl ClasspathResolver {
    /// Resolves `raw_entries` into roots, recording non-fatal problems
    /// (unreadable wildcard directories, corrupt jars, dangling Class-Path
    /// references) to `warnings` instead of failing the whole resolve.
    pub fn resolve(
        raw_entries: &[String],
        _config: &ResolveConfig,
        warnings: &WarningCollector,
    ) -> Vec<ResourceRoot> {
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        for raw in raw_entries {
            expand_entry(raw, &mut queue, warnings);
        }

        let mut roots = Vec::new();
        let mut seen = HashSet::new();
        let mut next_id = 0usize;

        while let Some(path) = queue.pop_front() {
            let raw = path.to_string_lossy().into_owned();
            let canon = if raw.contains('!') {
                path
            } else {
                canonicalize_if_possible(&path)
            };

            if !seen.insert(canon.clone()) {
                continue;
            }

            let kind = match classify(&canon, &raw) {
                Some(k) => k,
                None => {
                    warnings.push(Warning::new(
                        WarningKind::UnresolvedClasspathElement,
                        format!("not a directory, jar, or jmod: {}", canon.display()),
                    ));
                    continue;
                }
            };

            let (module_hint, is_multi_release, class_path_refs) = match kind {
                RootKind::Directory => (
                    derive_module_hint_from_dir(&canon),
                    dir_is_multi_release(&canon),
                    Vec::new(),
                ),
                RootKind::Jar | RootKind::Jmod => match inspect_jar(&canon) {
                    Ok(info) => (info.module_hint, info.is_multi_release, info.class_path),
                    Err(err) => {
                        warnings.push(
                            Warning::new(WarningKind::UnresolvedClasspathElement, err.to_string())
                                .with_class_name(canon.display().to_string()),
                        );
                        (None, false, Vec::new())
                    }
                },
                RootKind::Nested => (None, false, Vec::new()),
            };

            for rel in class_path_refs {
                if let Some(resolved) = resolve_relative(&canon, &rel) {
                    queue.push_back(resolved);
                } else {
                    warnings.push(Warning::new(
                        WarningKind::UnresolvedClasspathElement,
                        format!("Class-Path entry '{rel}' from {} has no parent directory", canon.display()),
                    ));
                }
            }

            roots.push(ResourceRoot {
                id: RootId::from_usize(next_id),
                kind,
                is_system: is_system_archive(&canon),
                module_hint,
                is_multi_release,
                path: canon,
            });
            next_id += 1;
        }

        roots
    }
}

fn expand_entry(raw: &str, queue: &mut VecDeque<PathBuf>, warnings: &WarningCollector) {
    if let Some(dir) = raw.strip_suffix("/*").or_else(|| raw.strip_suffix('*')) {
        let dir = dir.strip_suffix('/').unwrap_or(dir);
        let dir_path = PathBuf::from(dir);
        match std::fs::read_dir(&dir_path) {
            Ok(entries) => {
                let mut jars: Vec<PathBuf> = entries
                    .filter_map(std::result::Result::ok)
                    .map(|e| e.path())
                    .filter(|p| {
                        p.extension()
                            .and_then(|e| e.to_str())
                            .is_some_and(|e| e.eq_ignore_ascii_case("jar"))
                    })
                    .collect();
                // Directory iteration order is unspecified; sort for determinism.
                jars.sort();
                queue.extend(jars);
            }
            Err(err) => {
                warnings.push(Warning::new(
                    WarningKind::UnresolvedClasspathElement,
                    format!("wildcard classpath entry '{raw}' could not be read: {err}"),
                ));
            }
        }
        return;
    }

    queue.push_back(PathBuf::from(raw));
}

fn classify(path: &Path, raw: &str) -> Option<RootKind> {
    if raw.contains('!') {
        return Some(RootKind::Nested);
    }
    if path.is_dir() {
        return Some(RootKind::Directory);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jmod") => Some(RootKind::Jmod),
        Some(ext) if ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("war") => {
            Some(RootKind::Jar)
        }
        _ if path.is_file() => Some(RootKind::Jar),
        _ => None,
    }
}

fn canonicalize_if_possible(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn is_system_archive(path: &Path) -> bool {
    let s = path.to_string_lossy();
    s.contains("/jmods/")
        || s.ends_with("rt.jar")
        || s.contains("/lib/modules")
        || s.ends_with("jrt-fs.jar")
}

struct JarInfo {
    module_hint: Option<String>,
    is_multi_release: bool,
    class_path: Vec<String>,
}

fn inspect_jar(path: &Path) -> Result<JarInfo> {
    let file = std::fs::File::open(path).map_err(|source| ClasspathError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| ClasspathError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    let manifest_text = read_manifest_text(&mut archive);
    let is_multi_release = manifest_text
        .as_deref()
        .map(manifest_is_multi_release)
        .unwrap_or(false);
    let class_path = manifest_text
        .as_deref()
        .and_then(|m| module_name::manifest_main_attribute(m, "Class-Path"))
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let module_hint = module_name::automatic_module_name_from_jar_manifest(&mut archive)
        .or_else(|| module_name::derive_automatic_module_name_from_jar_path(path));

    Ok(JarInfo {
        module_hint,
        is_multi_release,
        class_path,
    })
}

fn read_manifest_text<R: Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>) -> Option<String> {
    let mut file = archive.by_name("META-INF/MANIFEST.MF").ok()?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn manifest_is_multi_release(manifest: &str) -> bool {
    for line in manifest.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("Multi-Release") {
            return value.trim().eq_ignore_ascii_case("true");
        }
    }
    false
}

fn dir_is_multi_release(dir: &Path) -> bool {
    if dir.join("META-INF").join("versions").is_dir() {
        return true;
    }
    std::fs::read_to_string(dir.join("META-INF").join("MANIFEST.MF"))
        .map(|m| manifest_is_multi_release(&m))
        .unwrap_or(false)
}

fn derive_module_hint_from_dir(dir: &Path) -> Option<String> {
    let stem = dir.file_name()?.to_string_lossy();
    module_name::derive_automatic_module_name_from_jar_stem(&stem)
}

/// `Class-Path:` entries are resolved relative to the jar's own directory.
fn resolve_relative(jar_path: &Path, rel: &str) -> Option<PathBuf> {
    let parent = jar_path.parent()?;
    Some(parent.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_jar(path: &Path, manifest: Option<&str>) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        if let Some(manifest) = manifest {
            writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
            writer.write_all(manifest.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn wildcard_entry_expands_to_sorted_jars_only() {
        let dir = tempfile::tempdir().unwrap();
        write_test_jar(&dir.path().join("b.jar"), None);
        write_test_jar(&dir.path().join("a.jar"), None);
        std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let warnings = WarningCollector::new();
        let pattern = format!("{}/*", dir.path().display());
        let roots = ClasspathResolver::resolve(
            &[pattern],
            &ResolveConfig::default(),
            &warnings,
        );

        assert_eq!(roots.len(), 2);
        assert!(roots[0].path.ends_with("a.jar"));
        assert!(roots[1].path.ends_with("b.jar"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn duplicate_entries_are_deduped_by_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let jar_path = dir.path().join("lib.jar");
        write_test_jar(&jar_path, None);

        let warnings = WarningCollector::new();
        let raw = jar_path.to_string_lossy().into_owned();
        let roots = ClasspathResolver::resolve(
            &[raw.clone(), raw],
            &ResolveConfig::default(),
            &warnings,
        );

        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn chases_class_path_manifest_entries() {
        let dir = tempfile::tempdir().unwrap();
        write_test_jar(&dir.path().join("dep.jar"), None);
        write_test_jar(
            &dir.path().join("main.jar"),
            Some("Manifest-Version: 1.0\r\nClass-Path: dep.jar\r\n\r\n"),
        );

        let warnings = WarningCollector::new();
        let raw = dir.path().join("main.jar").to_string_lossy().into_owned();
        let roots = ClasspathResolver::resolve(&[raw], &ResolveConfig::default(), &warnings);

        assert_eq!(roots.len(), 2);
        assert!(roots.iter().any(|r| r.path.ends_with("dep.jar")));
    }

    #[test]
    fn nested_archive_path_is_classified_without_touching_filesystem() {
        let warnings = WarningCollector::new();
        let roots = ClasspathResolver::resolve(
            &["outer.jar!inner.jar".to_string()],
            &ResolveConfig::default(),
            &warnings,
        );
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].kind, RootKind::Nested);
    }

    #[test]
    fn detects_jdk_style_system_archives() {
        assert!(is_system_archive(Path::new("/usr/lib/jvm/java-17/lib/modules")));
        assert!(is_system_archive(Path::new("/opt/jdk8/jre/lib/rt.jar")));
        assert!(!is_system_archive(Path::new("/home/me/project/lib/guava.jar")));
    }

    #[test]
    fn multi_release_manifest_flag_is_detected() {
        assert!(manifest_is_multi_release("Manifest-Version: 1.0\nMulti-Release: true\n"));
        assert!(!manifest_is_multi_release("Manifest-Version: 1.0\n"));
    }
}
