//! Orphan cleanup (spec §4.9) and the module-resolution rules it shares
//! with the orchestrator's relation filter (spec §4.6).

use std::collections::HashSet;

use codegraph_storage::{scroll_all, VectorStore};

use crate::shared::models::Result;

/// File extensions recognized as external references rather than missing
/// entities (spec §4.9: "is not an external file-reference (target bearing
/// a recognized file extension, e.g., json, csv, yaml, xml, txt, log, md,
/// pdf, xlsx, png, ...)").
const EXTERNAL_FILE_EXTENSIONS: &[&str] = &[
    "json", "csv", "yaml", "yml", "xml", "txt", "log", "md", "pdf", "xlsx", "png", "jpg", "jpeg",
    "gif", "html", "css", "js", "ts", "zip", "tar", "gz", "ini", "cfg", "conf", "toml", "sql",
    "db", "lock",
];

pub fn is_external_file_reference(target: &str) -> bool {
    match target.rsplit_once('.') {
        Some((_, ext)) => EXTERNAL_FILE_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Module-name resolution rules (spec §4.6):
/// - Relative dotted names: strip leading dots, convert remaining dots to
///   path separators, match against any entity name ending in `/{path}.py`.
/// - Absolute dotted names: every path component must appear in the
///   candidate entity name, and the last component must be a terminal
///   token.
/// - Bare package names: match any entity name containing `/{name}/` or
///   ending in `/{name}`.
pub fn resolves_as_module(candidate: &str, entity_names: &HashSet<String>) -> bool {
    if entity_names.contains(candidate) {
        return true;
    }

    if candidate.starts_with('.') {
        let stripped = candidate.trim_start_matches('.');
        let path = stripped.replace('.', "/");
        let suffix = format!("/{}.py", path);
        return entity_names.iter().any(|name| name.ends_with(&suffix));
    }

    if candidate.contains('.') {
        let components: Vec<&str> = candidate.split('.').collect();
        let last = components.last().copied().unwrap_or("");
        return entity_names.iter().any(|name| {
            components.iter().all(|c| name.contains(c)) && is_terminal_token(name, last)
        });
    }

    let bare_infix = format!("/{}/", candidate);
    let bare_suffix = format!("/{}", candidate);
    entity_names
        .iter()
        .any(|name| name.contains(&bare_infix) || name.ends_with(&bare_suffix))
}

fn is_terminal_token(name: &str, token: &str) -> bool {
    name.rsplit(['/', '.']).next() == Some(token)
}

/// Result of one orphan-sweep pass.
#[derive(Debug, Clone, Default)]
pub struct OrphanSweepResult {
    pub relations_scanned: usize,
    pub orphans_removed: usize,
}

/// Single atomic scroll pass (spec §4.9):
/// 1. Collect entity names (non-relation points) and all relation points.
/// 2. Mark a relation orphan if its `from_entity` doesn't resolve, or its
///    `to_entity` doesn't resolve and isn't an external file reference.
/// 3. Delete orphaned relation points in one batch.
pub async fn sweep(store: &dyn VectorStore, collection: &str) -> Result<OrphanSweepResult> {
    let all_points = scroll_all(store, collection, None, false, 500, 1000).await?;

    let mut entity_names: HashSet<String> = HashSet::new();
    let mut relations: Vec<(u64, String, String)> = Vec::new();

    for point in &all_points {
        let chunk_type = point.payload.get("chunk_type").and_then(|v| v.as_str());
        if chunk_type == Some("relation") {
            let from = point
                .payload
                .get("entity_name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let to = point
                .payload
                .get("relation_target")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            relations.push((point.id, from, to));
        } else if let Some(name) = point.payload.get("entity_name").and_then(|v| v.as_str()) {
            entity_names.insert(name.to_string());
        }
    }

    let mut orphan_ids = Vec::new();
    for (id, from, to) in &relations {
        let from_ok = resolves_as_module(from, &entity_names);
        let to_ok = resolves_as_module(to, &entity_names) || is_external_file_reference(to);
        if !from_ok || !to_ok {
            orphan_ids.push(*id);
        }
    }

    if !orphan_ids.is_empty() {
        store.delete_points(collection, &orphan_ids).await?;
    }

    Ok(OrphanSweepResult {
        relations_scanned: relations.len(),
        orphans_removed: orphan_ids.len(),
    })
}

/// Cooldown gate: whether enough time has elapsed since the last sweep to
/// run another one (§4.5 phase 5, §4.9's per-collection cooldown).
pub fn sweep_due(last_sweep: Option<std::time::Instant>, cooldown: std::time::Duration) -> bool {
    match last_sweep {
        None => true,
        Some(last) => last.elapsed() >= cooldown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_external_file_reference() {
        assert!(is_external_file_reference("data.json"));
        assert!(is_external_file_reference("report.xlsx"));
        assert!(!is_external_file_reference("helper"));
        assert!(!is_external_file_reference("src/app.py"));
    }

    #[test]
    fn test_resolves_relative_dotted_name() {
        let mut names = HashSet::new();
        names.insert("pkg/sub/mod.py".to_string());
        assert!(resolves_as_module(".sub.mod", &names));
    }

    #[test]
    fn test_resolves_absolute_dotted_name() {
        let mut names = HashSet::new();
        names.insert("pkg/utils/helpers.py".to_string());
        assert!(resolves_as_module("pkg.utils.helpers", &names));
    }

    #[test]
    fn test_resolves_bare_package_name() {
        let mut names = HashSet::new();
        names.insert("src/pkg/__init__.py".to_string());
        assert!(resolves_as_module("pkg", &names));
    }

    #[test]
    fn test_unresolvable_name_is_not_resolved() {
        let names = HashSet::new();
        assert!(!resolves_as_module("nonexistent.module", &names));
    }

    #[tokio::test]
    async fn test_sweep_removes_orphan_relation() {
        use codegraph_storage::{Distance, InMemoryVectorStore, Point};

        let store = InMemoryVectorStore::new();
        store.create_collection("proj", 3, Distance::Cosine).await.unwrap();

        let entity_point = Point::new(
            "file.py::file::file.py::metadata",
            serde_json::json!({"chunk_type": "metadata", "entity_name": "file.py"}),
        );
        let orphan_relation = Point::new(
            "gone::contains::ghost",
            serde_json::json!({
                "chunk_type": "relation",
                "entity_name": "gone",
                "relation_target": "ghost",
                "relation_type": "contains",
            }),
        );
        store
            .upsert_points("proj", vec![entity_point, orphan_relation], Default::default())
            .await
            .unwrap();

        let result = sweep(&store, "proj").await.unwrap();
        assert_eq!(result.relations_scanned, 1);
        assert_eq!(result.orphans_removed, 1);
        assert_eq!(store.count("proj").await.unwrap(), 1);
    }

    #[test]
    fn test_sweep_due_on_first_run() {
        assert!(sweep_due(None, std::time::Duration::from_secs(60)));
    }
}
