//! The domain schema: closed entity and relationship vocabularies shared by
//! the extraction prompt and the ingestion engine. Model output is matched
//! against these enums before anything reaches a graph-store statement;
//! free-form type strings never become labels.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Concept,
    Parameter,
    Component,
    Recommendation,
    /// Sentinel for types the model invented outside the registry.
    Unclassified,
}

impl EntityType {
    /// The types the model is asked to use. `Unclassified` is deliberately
    /// absent: it exists only as a coercion target.
    pub const PROMPTED: [EntityType; 4] = [
        EntityType::Concept,
        EntityType::Parameter,
        EntityType::Component,
        EntityType::Recommendation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Concept => "Concept",
            EntityType::Parameter => "Parameter",
            EntityType::Component => "Component",
            EntityType::Recommendation => "Recommendation",
            EntityType::Unclassified => "Unclassified",
        }
    }

    /// Human-readable definition, used only for prompting.
    pub fn definition(&self) -> &'static str {
        match self {
            EntityType::Concept => {
                "High-level technical idea or best practice (e.g., \"NUMA Optimization\", \"Memory Management\")"
            }
            EntityType::Parameter => {
                "Specific configuration setting (e.g., \"sched.cpu.affinity\", \"numa.nodeAffinity\")"
            }
            EntityType::Component => {
                "Software or hardware piece (e.g., \"vSphere\", \"SAP HANA\", \"Guest OS\")"
            }
            EntityType::Recommendation => "Best practice rule or guideline",
            EntityType::Unclassified => "Entity whose type could not be classified",
        }
    }

    /// Edge label linking a document chunk to an entity of this type.
    pub fn link_label(&self) -> String {
        format!("HAS_{}", self.label().to_uppercase())
    }

    pub fn parse(s: &str) -> Option<EntityType> {
        let all = [
            EntityType::Concept,
            EntityType::Parameter,
            EntityType::Component,
            EntityType::Recommendation,
            EntityType::Unclassified,
        ];
        all.into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationshipType {
    HasConcept,
    DescribesParameter,
    InvolvesComponent,
    SetsParameter,
    Affects,
    ForConcept,
    /// Sentinel for relationship types outside the registry.
    RelatedTo,
}

impl RelationshipType {
    pub const PROMPTED: [RelationshipType; 6] = [
        RelationshipType::HasConcept,
        RelationshipType::DescribesParameter,
        RelationshipType::InvolvesComponent,
        RelationshipType::SetsParameter,
        RelationshipType::Affects,
        RelationshipType::ForConcept,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RelationshipType::HasConcept => "HAS_CONCEPT",
            RelationshipType::DescribesParameter => "DESCRIBES_PARAMETER",
            RelationshipType::InvolvesComponent => "INVOLVES_COMPONENT",
            RelationshipType::SetsParameter => "SETS_PARAMETER",
            RelationshipType::Affects => "AFFECTS",
            RelationshipType::ForConcept => "FOR_CONCEPT",
            RelationshipType::RelatedTo => "RELATED_TO",
        }
    }

    pub fn definition(&self) -> &'static str {
        match self {
            RelationshipType::HasConcept => "Document discusses concept",
            RelationshipType::DescribesParameter => "Document describes parameter",
            RelationshipType::InvolvesComponent => "Concept involves component",
            RelationshipType::SetsParameter => "Recommendation sets parameter",
            RelationshipType::Affects => "Parameter affects component",
            RelationshipType::ForConcept => "Recommendation for concept",
            RelationshipType::RelatedTo => "Generic association",
        }
    }

    pub fn parse(s: &str) -> Option<RelationshipType> {
        let all = [
            RelationshipType::HasConcept,
            RelationshipType::DescribesParameter,
            RelationshipType::InvolvesComponent,
            RelationshipType::SetsParameter,
            RelationshipType::Affects,
            RelationshipType::ForConcept,
            RelationshipType::RelatedTo,
        ];
        all.into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
    }
}

/// Entity as it appears in the model's JSON reply. The type stays a raw
/// string here; coercion against the registry happens at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

/// Transient per-chunk extraction output. Never persisted directly; the
/// ingestion engine merges its contents into the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relationships: Vec<ExtractedRelationship>,
    #[serde(default)]
    pub chunk_summary: String,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty() && self.chunk_summary.is_empty()
    }
}
