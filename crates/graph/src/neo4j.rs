use anyhow::{Context, Result};
use async_trait::async_trait;
use extract::schema::{EntityType, RelationshipType};
use neo4rs::{Graph, Query};
use tracing::info;

use crate::store::{
    ChunkMention, EdgeRecord, EntityKey, EntityRecord, GraphStats, GraphStore,
};

/// Neo4j-backed store. Node and edge labels are always taken from the schema
/// enums, so the only strings interpolated into Cypher come from a closed
/// vocabulary; everything else travels as a query parameter.
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;
        info!(uri, "connected to graph store");
        Ok(Self { graph })
    }

    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    async fn count(&self, cypher: String) -> Result<usize> {
        let mut result = self.graph.execute(Query::new(cypher)).await?;
        let count = if let Some(row) = result.next().await? {
            row.get::<i64>("count").unwrap_or(0) as usize
        } else {
            0
        };
        Ok(count)
    }

    fn entity_key_from_label(label: String, name: String) -> EntityKey {
        let entity_type = EntityType::parse(&label).unwrap_or(EntityType::Unclassified);
        EntityKey { entity_type, name }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn clear(&self) -> Result<()> {
        self.graph
            .run(Query::new("MATCH (n) DETACH DELETE n".to_string()))
            .await
            .context("Failed to clear graph store")?;
        Ok(())
    }

    async fn merge_chunk(&self, chunk_id: &str, summary: &str) -> Result<()> {
        let query = Query::new(
            "MERGE (d:Document {chunk_id: $chunk_id}) SET d.summary = $summary".to_string(),
        )
        .param("chunk_id", chunk_id.to_string())
        .param("summary", summary.to_string());

        self.graph
            .run(query)
            .await
            .context("Failed to merge chunk node")?;
        Ok(())
    }

    async fn merge_entity(&self, key: &EntityKey, description: &str) -> Result<()> {
        let query = Query::new(format!(
            "MERGE (e:{} {{name: $name}}) SET e.description = $description",
            key.entity_type.label()
        ))
        .param("name", key.name.clone())
        .param("description", description.to_string());

        self.graph
            .run(query)
            .await
            .context("Failed to merge entity node")?;
        Ok(())
    }

    async fn link_chunk(&self, chunk_id: &str, entity: &EntityKey) -> Result<()> {
        let query = Query::new(format!(
            r#"
            MATCH (d:Document {{chunk_id: $chunk_id}})
            MATCH (e:{} {{name: $name}})
            MERGE (d)-[:{}]->(e)
            "#,
            entity.entity_type.label(),
            entity.entity_type.link_label()
        ))
        .param("chunk_id", chunk_id.to_string())
        .param("name", entity.name.clone());

        self.graph
            .run(query)
            .await
            .context("Failed to link chunk to entity")?;
        Ok(())
    }

    async fn merge_relationship(
        &self,
        from: &EntityKey,
        to: &EntityKey,
        rel: RelationshipType,
    ) -> Result<()> {
        let query = Query::new(format!(
            r#"
            MATCH (a:{} {{name: $from_name}})
            MATCH (b:{} {{name: $to_name}})
            MERGE (a)-[:{}]->(b)
            "#,
            from.entity_type.label(),
            to.entity_type.label(),
            rel.label()
        ))
        .param("from_name", from.name.clone())
        .param("to_name", to.name.clone());

        self.graph
            .run(query)
            .await
            .context("Failed to merge relationship")?;
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<EntityKey>> {
        let query = Query::new(
            r#"
            MATCH (e)
            WHERE NOT e:Document AND e.name = $name
            RETURN labels(e)[0] AS label, e.name AS name
            "#
            .to_string(),
        )
        .param("name", name.to_string());

        let mut result = self.graph.execute(query).await?;
        let mut keys = Vec::new();
        while let Some(row) = result.next().await? {
            keys.push(Self::entity_key_from_label(
                row.get("label")?,
                row.get("name")?,
            ));
        }
        Ok(keys)
    }

    async fn get_entities(&self, names: &[String]) -> Result<Vec<EntityRecord>> {
        let query = Query::new(
            r#"
            MATCH (e)
            WHERE NOT e:Document AND e.name IN $names
            RETURN labels(e)[0] AS label, e.name AS name,
                   coalesce(e.description, '') AS description
            "#
            .to_string(),
        )
        .param("names", names.to_vec());

        let mut result = self.graph.execute(query).await?;
        let mut records = Vec::new();
        while let Some(row) = result.next().await? {
            records.push(EntityRecord {
                key: Self::entity_key_from_label(row.get("label")?, row.get("name")?),
                description: row.get("description").unwrap_or_else(|_| String::new()),
            });
        }
        Ok(records)
    }

    async fn search_entities(&self, terms: &[String], limit: usize) -> Result<Vec<EntityRecord>> {
        let query = Query::new(format!(
            r#"
            MATCH (e)
            WHERE NOT e:Document AND any(term IN $terms
                WHERE toLower(e.name) CONTAINS term
                   OR toLower(coalesce(e.description, '')) CONTAINS term)
            RETURN labels(e)[0] AS label, e.name AS name,
                   coalesce(e.description, '') AS description
            LIMIT {limit}
            "#
        ))
        .param("terms", terms.to_vec());

        let mut result = self.graph.execute(query).await?;
        let mut records = Vec::new();
        while let Some(row) = result.next().await? {
            records.push(EntityRecord {
                key: Self::entity_key_from_label(row.get("label")?, row.get("name")?),
                description: row.get("description").unwrap_or_else(|_| String::new()),
            });
        }
        Ok(records)
    }

    async fn neighbors(&self, names: &[String], limit: usize) -> Result<Vec<EdgeRecord>> {
        let query = Query::new(format!(
            r#"
            MATCH (a)-[r]->(b)
            WHERE NOT a:Document AND NOT b:Document
              AND (a.name IN $names OR b.name IN $names)
            RETURN a.name AS from_name, type(r) AS rel, b.name AS to_name
            LIMIT {limit}
            "#
        ))
        .param("names", names.to_vec());

        let mut result = self.graph.execute(query).await?;
        let mut edges = Vec::new();
        while let Some(row) = result.next().await? {
            edges.push(EdgeRecord {
                from: row.get("from_name")?,
                rel: row.get("rel")?,
                to: row.get("to_name")?,
            });
        }
        Ok(edges)
    }

    async fn chunk_mentions(&self, names: &[String], limit: usize) -> Result<Vec<ChunkMention>> {
        let query = Query::new(format!(
            r#"
            MATCH (d:Document)-->(e)
            WHERE e.name IN $names
            RETURN DISTINCT d.chunk_id AS chunk_id, coalesce(d.summary, '') AS summary
            LIMIT {limit}
            "#
        ))
        .param("names", names.to_vec());

        let mut result = self.graph.execute(query).await?;
        let mut mentions = Vec::new();
        while let Some(row) = result.next().await? {
            mentions.push(ChunkMention {
                chunk_id: row.get("chunk_id")?,
                summary: row.get("summary").unwrap_or_else(|_| String::new()),
            });
        }
        Ok(mentions)
    }

    async fn stats(&self) -> Result<GraphStats> {
        let label_count = |label: &str| {
            format!("MATCH (n:{label}) RETURN count(n) AS count")
        };

        Ok(GraphStats {
            concepts: self.count(label_count("Concept")).await?,
            parameters: self.count(label_count("Parameter")).await?,
            components: self.count(label_count("Component")).await?,
            recommendations: self.count(label_count("Recommendation")).await?,
            unclassified: self.count(label_count("Unclassified")).await?,
            documents: self.count(label_count("Document")).await?,
            chunk_links: self
                .count("MATCH (:Document)-[r]->() RETURN count(r) AS count".to_string())
                .await?,
            relationships: self
                .count(
                    "MATCH (a)-[r]->(b) WHERE NOT a:Document AND NOT b:Document \
                     RETURN count(r) AS count"
                        .to_string(),
                )
                .await?,
        })
    }
}
