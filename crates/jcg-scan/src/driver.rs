//! The concurrent scan driver: turns a resolved classpath into a frozen
//! [`jcg_graph::ScanResult`] by enumerating classfile entries across every
//! resource root, parsing them in parallel, and handing the results to a
//! [`jcg_graph::RelationshipLinker`].

use std::fs::File;

use jcg_archive::NestedArchiveHandler;
use jcg_classfile::{ClassfileParser, RawClassInfo, RawField, RawMethod};
use jcg_classpath::{ClasspathResolver, ResolveConfig, ResourceRoot, RootKind};
use jcg_core::{EntryId, RootId, Warning, WarningCollector, WarningKind};
use jcg_graph::{ClassRecord, ConstantValue, FieldRecord, MethodRecord, RelationshipLinker, ScanResult};
use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::config::ScanConfig;
use crate::context::ScanContext;
use crate::error::{Result, ScanError};
use crate::source::ClasspathSource;

/// One classfile entry discovered under a resource root, not yet parsed.
/// `relative_path` is the logical, version-stripped path used to derive the
/// expected class name and to key masking/sort order; `read` carries
/// whatever the zip reader (or filesystem) actually needs to fetch the
/// bytes, which for a multi-release overlay is the versioned member name.
struct PendingEntry {
    root_id: RootId,
    entry_id: EntryId,
    relative_path: String,
    read: EntrySource,
}

enum EntrySource {
    Plain(std::path::PathBuf),
    Jar { archive_path: std::path::PathBuf, member: String },
    Nested { spec: String, relative: String },
}

pub struct ScanDriver;

impl ScanDriver {
    /// Runs a full scan: resolve the classpath, enumerate classfile entries,
    /// parse them concurrently, and link the results into a graph.
    pub fn scan(
        sources: &[Box<dyn ClasspathSource>],
        config: &ScanConfig,
        context: &ScanContext,
        cancellation: &CancellationToken,
    ) -> Result<ScanResult> {
        let _span = context.span().enter();
        config.validate(context.warnings()).map_err(|_| {
            ScanError::InvalidConfiguration("scan configuration failed validation".to_string())
        })?;

        let raw_entries = gather_raw_entries(sources, config);
        if raw_entries.is_empty() {
            return Ok(RelationshipLinker::new()
                .with_retain_external_references(config.retain_external_references)
                .freeze(context.warnings()));
        }

        let resolve_config = ResolveConfig {
            target_release: config.target_release,
        };
        let mut roots = ClasspathResolver::resolve(&raw_entries, &resolve_config, context.warnings());
        if config.exclude_system_archives {
            roots.retain(|r| !r.is_system);
        }

        if cancellation.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut pending = Vec::new();
        let mut next_entry_id = 0usize;
        for root in &roots {
            for (relative_path, read) in enumerate_entries(root, config.target_release, context.warnings()) {
                pending.push(PendingEntry {
                    root_id: root.id,
                    entry_id: EntryId::from_usize(next_entry_id),
                    relative_path,
                    read,
                });
                next_entry_id += 1;
            }
        }

        // Sort by (root classpath order, relative path) so that, however
        // parsing completes, the first-root-wins masking in the linker sees
        // candidates in a deterministic order (spec: "linker sorts entries
        // by classpath-order then relative-path before wiring edges").
        pending.sort_by(|a, b| a.root_id.raw().cmp(&b.root_id.raw()).then_with(|| a.relative_path.cmp(&b.relative_path)));

        let filter = config.filter();
        let handler = NestedArchiveHandler::new(config.enable_memory_mapping)
            .map_err(|err| ScanError::Internal(err.to_string()))?;

        let parse_all = || -> Vec<Option<ClassRecord>> {
            pending
                .par_iter()
                .map(|entry| {
                    if cancellation.is_cancelled() {
                        return None;
                    }
                    parse_entry(entry, &handler, config, context.warnings())
                        .filter(|record| !is_ignored_class(&record.name))
                        .filter(|record| filter.accepts(&record.name))
                })
                .collect()
        };

        let parsed: Vec<Option<ClassRecord>> = if config.worker_count == 0 {
            parse_all()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_count as usize)
                .build()
                .map_err(|err| ScanError::Internal(err.to_string()))?;
            pool.install(parse_all)
        };

        if cancellation.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut linker = RelationshipLinker::new().with_retain_external_references(config.retain_external_references);
        for record in parsed.into_iter().flatten() {
            linker.add_class(record);
        }

        Ok(linker.freeze(context.warnings()))
    }
}

fn gather_raw_entries(sources: &[Box<dyn ClasspathSource>], config: &ScanConfig) -> Vec<String> {
    if let Some(override_str) = &config.classpath_override {
        let separator = if cfg!(windows) { ';' } else { ':' };
        return override_str
            .split(separator)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    sources.iter().flat_map(|s| s.entries()).collect()
}

/// Classes the linker should validate but never surface as graph nodes:
/// `package-info`/`module-info` carry no relationship information of
/// interest to this graph, and `java.lang.Object` is the implicit universal
/// root that the graph never materializes (its own classfile parses fine,
/// for callers that just want to validate it exists on the classpath, but
/// it is dropped here before ever reaching the linker).
fn is_ignored_class(name: &str) -> bool {
    name == "java.lang.Object"
        || matches!(name.rsplit('.').next(), Some("package-info") | Some("module-info"))
}

/// Enumerates the classfile entries visible under one resource root,
/// pairing each entry's logical (version-stripped) relative path with the
/// [`EntrySource`] that will actually fetch its bytes.
fn enumerate_entries(
    root: &ResourceRoot,
    target_release: Option<u16>,
    warnings: &WarningCollector,
) -> Vec<(String, EntrySource)> {
    match root.kind {
        RootKind::Directory => enumerate_directory(root),
        RootKind::Jar | RootKind::Jmod => enumerate_jar(root, target_release, warnings),
        RootKind::Nested => enumerate_nested(root, warnings),
    }
}

fn enumerate_directory(root: &ResourceRoot) -> Vec<(String, EntrySource)> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(&root.path).sort_by_file_name() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&root.path) else { continue };
        let relative = relative.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
        if relative.ends_with(".class") {
            let source = EntrySource::Plain(entry.path().to_path_buf());
            out.push((relative, source));
        }
    }
    out
}

/// Selects, for each logical relative path, the base entry or the highest
/// `META-INF/versions/<n>/` overlay with `n <= target_release`. When
/// `target_release` is `None`, overlays are ignored entirely and only base
/// entries are considered (conservative default).
fn enumerate_jar(
    root: &ResourceRoot,
    target_release: Option<u16>,
    warnings: &WarningCollector,
) -> Vec<(String, EntrySource)> {
    let Ok(file) = File::open(&root.path) else {
        warnings.push(Warning::new(
            WarningKind::UnreadableEntry,
            format!("failed to open archive: {}", root.path.display()),
        ));
        return Vec::new();
    };
    let Ok(mut archive) = zip::ZipArchive::new(file) else {
        warnings.push(Warning::new(
            WarningKind::UnreadableEntry,
            format!("failed to read central directory: {}", root.path.display()),
        ));
        return Vec::new();
    };

    let mut base: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut overlays: std::collections::HashMap<String, Vec<(u16, String)>> = std::collections::HashMap::new();

    for i in 0..archive.len() {
        let Ok(entry) = archive.by_index(i) else { continue };
        let name = entry.name().to_string();
        if entry.is_dir() || !name.ends_with(".class") {
            continue;
        }
        if root.is_multi_release {
            if let Some((version, rest)) = parse_versioned_entry(&name) {
                overlays.entry(rest).or_default().push((version, name));
                continue;
            }
        }
        base.insert(name);
    }

    let mut winners: std::collections::HashMap<String, String> =
        base.iter().map(|name| (name.clone(), name.clone())).collect();

    if let Some(target) = target_release {
        for (logical, mut versions) in overlays {
            versions.retain(|(v, _)| *v <= target);
            if let Some((_, member)) = versions.into_iter().max_by_key(|(v, _)| *v) {
                winners.insert(logical, member);
            }
        }
    }

    let mut out: Vec<(String, String)> = winners.into_iter().collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out.into_iter()
        .map(|(logical, member)| {
            let source = EntrySource::Jar {
                archive_path: root.path.clone(),
                member,
            };
            (logical, source)
        })
        .collect()
}

fn parse_versioned_entry(name: &str) -> Option<(u16, String)> {
    let rest = name.strip_prefix("META-INF/versions/")?;
    let (version_str, path) = rest.split_once('/')?;
    let version: u16 = version_str.parse().ok()?;
    Some((version, path.to_string()))
}

fn enumerate_nested(root: &ResourceRoot, warnings: &WarningCollector) -> Vec<(String, EntrySource)> {
    let spec = root.path.to_string_lossy().into_owned();
    let handler = match NestedArchiveHandler::new(false) {
        Ok(h) => h,
        Err(err) => {
            warnings.push(Warning::new(WarningKind::UnreadableEntry, err.to_string()));
            return Vec::new();
        }
    };
    let resolved = match handler.resolve_root(&spec) {
        Ok(r) => r,
        Err(err) => {
            warnings.push(Warning::new(WarningKind::UnreadableEntry, err.to_string()));
            return Vec::new();
        }
    };
    let Ok(file) = File::open(&resolved.archive_path_for_pool) else {
        return Vec::new();
    };
    let Ok(mut archive) = zip::ZipArchive::new(file) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for i in 0..archive.len() {
        let Ok(entry) = archive.by_index(i) else { continue };
        let name = entry.name();
        if entry.is_dir() || !name.ends_with(".class") {
            continue;
        }
        if let Some(relative) = name.strip_prefix(resolved.inner_path_prefix.as_str()) {
            let source = EntrySource::Nested {
                spec: spec.clone(),
                relative: relative.to_string(),
            };
            out.push((relative.to_string(), source));
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn expected_name_from_relative_path(relative_path: &str) -> String {
    relative_path.trim_end_matches(".class").replace('/', ".")
}

fn parse_entry(
    entry: &PendingEntry,
    handler: &NestedArchiveHandler,
    config: &ScanConfig,
    warnings: &WarningCollector,
) -> Option<ClassRecord> {
    let expected_name = expected_name_from_relative_path(&entry.relative_path);
    let bytes = match &entry.read {
        EntrySource::Plain(path) => std::fs::read(path).ok()?,
        EntrySource::Jar { archive_path, member } => {
            let file = File::open(archive_path).ok()?;
            let mut archive = zip::ZipArchive::new(file).ok()?;
            let mut zip_entry = archive.by_name(member).ok()?;
            let mut buf = Vec::with_capacity(zip_entry.size() as usize);
            std::io::Read::read_to_end(&mut zip_entry, &mut buf).ok()?;
            buf
        }
        EntrySource::Nested { spec, relative } => {
            let root = handler.resolve_root(spec).ok()?;
            handler.read_entry(&root, relative).ok()?.load_all().ok()?
        }
    };

    match ClassfileParser::parse(&bytes, Some(&expected_name), &config.parse_options) {
        Ok(info) => Some(to_class_record(info, entry.root_id, entry.entry_id)),
        Err(err) => {
            warnings.push(
                Warning::new(WarningKind::MalformedClassfile, err.to_string())
                    .with_class_name(expected_name),
            );
            None
        }
    }
}

fn to_class_record(info: RawClassInfo, root_id: RootId, entry_id: EntryId) -> ClassRecord {
    ClassRecord {
        name: info.name,
        root_id,
        entry_id,
        is_interface: info.flags.is_interface(),
        is_abstract: info.flags.is_abstract(),
        is_annotation: info.flags.is_annotation(),
        is_enum: info.flags.is_enum(),
        superclass_name: info.superclass_name,
        interface_names: info.interface_names,
        annotation_names: info.annotation_names,
        fields: info.fields.into_iter().map(to_field_record).collect(),
        methods: info.methods.into_iter().map(to_method_record).collect(),
    }
}

fn to_field_record(field: RawField) -> FieldRecord {
    FieldRecord {
        name: field.name,
        descriptor: field.descriptor,
        referenced_type_names: field.referenced_type_names,
        is_static: field.flags.is_static(),
        is_final: field.flags.is_final(),
        constant_value: field.constant_value.map(to_constant_value),
        annotation_names: field.annotation_names,
    }
}

fn to_method_record(method: RawMethod) -> MethodRecord {
    MethodRecord {
        name: method.name,
        descriptor: method.descriptor,
        referenced_type_names: method.referenced_type_names,
        annotation_names: method.annotation_names,
        parameter_annotation_names: method.parameter_annotation_names,
        thrown_type_names: method.thrown_type_names,
    }
}

fn to_constant_value(value: jcg_classfile::ConstantValue) -> ConstantValue {
    match value {
        jcg_classfile::ConstantValue::Byte(v) => ConstantValue::Byte(v),
        jcg_classfile::ConstantValue::Char(v) => ConstantValue::Char(v),
        jcg_classfile::ConstantValue::Short(v) => ConstantValue::Short(v),
        jcg_classfile::ConstantValue::Int(v) => ConstantValue::Int(v),
        jcg_classfile::ConstantValue::Long(v) => ConstantValue::Long(v),
        jcg_classfile::ConstantValue::Float(v) => ConstantValue::Float(v),
        jcg_classfile::ConstantValue::Double(v) => ConstantValue::Double(v),
        jcg_classfile::ConstantValue::Boolean(v) => ConstantValue::Boolean(v),
        jcg_classfile::ConstantValue::String(v) => ConstantValue::String(v),
    }
}
