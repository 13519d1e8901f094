//! Unified content processor (spec §4.5).
//!
//! A single entry point, `process_all_content`, performs five phases:
//! entity metadata, relation, implementation, batch store, orphan sweep.
//! Cyclic references between entities and relations are not modeled as a
//! persistent in-memory graph (§9) — both are flat records, joined only by
//! name through the `changed_entity_ids` set maintained for the duration of
//! one call.

use std::collections::HashSet;

use codegraph_storage::{Point, UpsertConfig, VectorStore};

use crate::features::dedup::DedupGate;
use crate::features::embedding::{DenseEmbedder, SparseEmbedder};
use crate::features::orphan_cleanup::{self, OrphanSweepResult};
use crate::shared::models::{Entity, EntityChunk, Relation, Result};

/// Aggregate counts, embedding cost, and token usage for one
/// `process_all_content` call (spec §4.5: "A processing result aggregates
/// counts, embedding cost, and token usage").
#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
    pub entities_processed: usize,
    pub relations_processed: usize,
    pub implementations_processed: usize,
    pub points_written: usize,
    pub embedding_cost: f64,
    pub token_count: usize,
    pub errors: Vec<String>,
    pub orphan_sweep: Option<OrphanSweepResult>,
}

/// Orchestrates dedup (C3) → embed (C4) → point-build → batch-upsert (C5) →
/// orphan cleanup (C10) for one batch of parsed content.
pub struct ContentProcessor<'a> {
    store: &'a dyn VectorStore,
    dense: &'a dyn DenseEmbedder,
    sparse: Option<&'a dyn SparseEmbedder>,
    collection: String,
}

impl<'a> ContentProcessor<'a> {
    pub fn new(store: &'a dyn VectorStore, dense: &'a dyn DenseEmbedder, collection: impl Into<String>) -> Self {
        Self {
            store,
            dense,
            sparse: None,
            collection: collection.into(),
        }
    }

    pub fn with_sparse(mut self, sparse: &'a dyn SparseEmbedder) -> Self {
        self.sparse = Some(sparse);
        self
    }

    /// §4.5's five-phase pipeline. `changed_entity_ids` accumulates
    /// `"{file_path}::{entity_name}"` keys across phase 1 and is consulted
    /// (not reset) by phase 2, matching the documented ordering (entities
    /// before relations).
    pub async fn process_all_content(
        &self,
        entities: &[Entity],
        relations: &[Relation],
        impl_chunks: &[EntityChunk],
        changed_entity_ids: &mut HashSet<String>,
        orphan_sweep_due: bool,
    ) -> Result<ProcessingResult> {
        let mut result = ProcessingResult::default();
        let mut points: Vec<Point> = Vec::new();

        let impl_entity_names: HashSet<&str> =
            impl_chunks.iter().map(|c| c.entity_name.as_str()).collect();

        // Phase 1: entity metadata.
        let gate = DedupGate::new(self.store, &self.collection);
        let mut metadata_texts = Vec::new();
        let mut metadata_chunks = Vec::new();

        for entity in entities {
            let has_implementation = impl_entity_names.contains(entity.name());
            let content = metadata_content(entity);
            let mut chunk = EntityChunk::metadata(entity.name(), entity.entity_type(), content)
                .with_has_implementation(has_implementation);
            if let Some(file_path) = entity.file_path() {
                chunk = chunk.with_file_path(file_path);
            }
            if let Some(line) = entity.line_number() {
                chunk = chunk.with_line_range(line, entity.end_line_number().unwrap_or(line));
            }

            if gate.needs_processing(&chunk.content_hash()).await? {
                if let Some(file_path) = entity.file_path() {
                    changed_entity_ids.insert(format!("{}::{}", file_path, entity.name()));
                }
                metadata_texts.push(chunk.content.clone());
                metadata_chunks.push(chunk);
            }
        }

        if !metadata_chunks.is_empty() {
            let dense_results = self.dense.embed_batch(&metadata_texts).await?;
            let sparse_results = match self.sparse {
                Some(sparse) => Some(sparse.embed_batch(&metadata_texts).await?),
                None => None,
            };

            for (i, chunk) in metadata_chunks.iter().enumerate() {
                let dense = &dense_results[i];
                if let Some(error) = &dense.error {
                    result.errors.push(error.clone());
                    continue;
                }
                result.embedding_cost += dense.cost_estimate;
                result.token_count += dense.token_count;

                let mut point = Point::new(chunk.id_string(), chunk.payload(&self.collection))
                    .with_dense(dense.vector.clone());
                if let Some(sparse_vecs) = &sparse_results {
                    point = point.with_sparse(sparse_vecs[i].clone());
                }
                points.push(point);
                result.entities_processed += 1;
            }
        }

        // Phase 2: relations, filtered to those touching a changed entity.
        let relevant_relations: Vec<&Relation> = if changed_entity_ids.is_empty() {
            relations.iter().collect()
        } else {
            relations
                .iter()
                .filter(|r| {
                    changed_entity_ids
                        .iter()
                        .any(|id| id.ends_with(&format!("::{}", r.from_entity)) || id.ends_with(&format!("::{}", r.to_entity)))
                })
                .collect()
        };

        let mut seen_relation_ids = HashSet::new();
        let mut relation_texts = Vec::new();
        let mut relation_chunks = Vec::new();

        for relation in relevant_relations {
            let content = relation_content(relation);
            let mut chunk = crate::shared::models::RelationChunk::new(
                relation.from_entity.clone(),
                relation.to_entity.clone(),
                relation.relation_type,
                content,
            )
            .with_confidence(relation.confidence);
            if let Some(import_type) = relation.import_type() {
                chunk = chunk.with_import_type(import_type);
            }
            if let Some(context) = &relation.context {
                chunk = chunk.with_context(context.clone());
            }

            if !seen_relation_ids.insert(chunk.id_string()) {
                continue;
            }
            if gate.needs_processing(&chunk.content_hash()).await? {
                relation_texts.push(chunk.content.clone());
                relation_chunks.push(chunk);
            }
        }

        if !relation_chunks.is_empty() {
            let dense_results = self.dense.embed_batch(&relation_texts).await?;
            for (i, chunk) in relation_chunks.iter().enumerate() {
                let dense = &dense_results[i];
                if let Some(error) = &dense.error {
                    result.errors.push(error.clone());
                    continue;
                }
                result.embedding_cost += dense.cost_estimate;
                result.token_count += dense.token_count;
                let point = Point::new(chunk.id_string(), chunk.payload(&self.collection))
                    .with_dense(dense.vector.clone());
                points.push(point);
                result.relations_processed += 1;
            }
        }

        // Phase 3: implementation chunks, dense-only.
        let mut impl_texts = Vec::new();
        let mut impl_to_store = Vec::new();
        for chunk in impl_chunks {
            if gate.needs_processing(&chunk.content_hash()).await? {
                impl_texts.push(chunk.content.clone());
                impl_to_store.push(chunk);
            }
        }

        if !impl_to_store.is_empty() {
            let dense_results = self.dense.embed_batch(&impl_texts).await?;
            for (i, chunk) in impl_to_store.iter().enumerate() {
                let dense = &dense_results[i];
                if let Some(error) = &dense.error {
                    result.errors.push(error.clone());
                    continue;
                }
                result.embedding_cost += dense.cost_estimate;
                result.token_count += dense.token_count;
                let point = Point::new(chunk.id_string(), chunk.payload(&self.collection))
                    .with_dense(dense.vector.clone());
                points.push(point);
                result.implementations_processed += 1;
            }
        }

        // Phase 4: batch store.
        if !points.is_empty() {
            let report = self
                .store
                .upsert_points(&self.collection, points, UpsertConfig::default())
                .await?;
            result.points_written = report.written;
            if report.has_discrepancy() {
                tracing::warn!(
                    attempted = report.attempted,
                    written = report.written,
                    "upsert wrote fewer points than attempted"
                );
            }
        }

        // Phase 5: orphan sweep, cooldown-gated by the caller.
        if orphan_sweep_due {
            match orphan_cleanup::sweep(self.store, &self.collection).await {
                Ok(sweep) => result.orphan_sweep = Some(sweep),
                Err(err) => result.errors.push(err.to_string()),
            }
        }

        Ok(result)
    }
}

fn metadata_content(entity: &Entity) -> String {
    let mut parts = vec![format!("{} {}", entity.entity_type(), entity.name())];
    if let Some(signature) = entity.signature() {
        parts.push(signature.to_string());
    }
    if let Some(docstring) = entity.docstring() {
        parts.push(docstring.to_string());
    }
    parts.extend(entity.observations().iter().cloned());
    parts.join("\n")
}

fn relation_content(relation: &Relation) -> String {
    format!(
        "{} {} {}",
        relation.from_entity,
        relation.relation_type.as_str(),
        relation.to_entity
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::EntityType;
    use async_trait::async_trait;
    use codegraph_storage::{Distance, InMemoryVectorStore};

    struct FakeEmbedder;

    #[async_trait]
    impl DenseEmbedder for FakeEmbedder {
        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> Result<Vec<crate::features::embedding::EmbeddingResult>> {
            Ok(texts
                .iter()
                .map(|_| crate::features::embedding::EmbeddingResult {
                    vector: vec![0.1, 0.2, 0.3],
                    model: "fake".to_string(),
                    token_count: 3,
                    processing_time_ms: 1,
                    cost_estimate: 0.0001,
                    error: None,
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "fake"
        }

        fn vector_size(&self) -> usize {
            3
        }
    }

    #[tokio::test]
    async fn test_process_new_entities_writes_points() {
        let store = InMemoryVectorStore::new();
        store.create_collection("proj", 3, Distance::Cosine).await.unwrap();
        let embedder = FakeEmbedder;
        let processor = ContentProcessor::new(&store, &embedder, "proj");

        let entities = vec![
            Entity::builder("file.py", EntityType::File).file_path("file.py").build(),
            Entity::builder("add", EntityType::Function)
                .file_path("file.py")
                .line_range(1, 2)
                .build(),
        ];
        let relations = vec![Relation::new(
            "file.py",
            "add",
            crate::shared::models::RelationType::Contains,
        )];

        let mut changed = HashSet::new();
        let result = processor
            .process_all_content(&entities, &relations, &[], &mut changed, false)
            .await
            .unwrap();

        assert_eq!(result.entities_processed, 2);
        assert_eq!(result.relations_processed, 1);
        assert!(result.points_written >= 3);
    }

    #[tokio::test]
    async fn test_unchanged_content_skips_reembedding() {
        let store = InMemoryVectorStore::new();
        store.create_collection("proj", 3, Distance::Cosine).await.unwrap();
        let embedder = FakeEmbedder;
        let processor = ContentProcessor::new(&store, &embedder, "proj");

        let entities = vec![Entity::builder("add", EntityType::Function)
            .file_path("file.py")
            .build()];

        let mut changed = HashSet::new();
        processor
            .process_all_content(&entities, &[], &[], &mut changed, false)
            .await
            .unwrap();

        let mut changed2 = HashSet::new();
        let second = processor
            .process_all_content(&entities, &[], &[], &mut changed2, false)
            .await
            .unwrap();

        assert_eq!(second.entities_processed, 0);
    }
}
