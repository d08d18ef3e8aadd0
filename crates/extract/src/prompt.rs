use crate::schema::{EntityType, RelationshipType};

/// Build the structured extraction prompt for one chunk. The schema section
/// is generated from the registry enums so the prompt cannot drift from what
/// ingestion validates against.
pub fn build_extraction_prompt(chunk_text: &str) -> String {
    let mut entity_defs = String::new();
    for entity_type in EntityType::PROMPTED {
        entity_defs.push_str(&format!(
            "- {}: {}\n",
            entity_type.label(),
            entity_type.definition()
        ));
    }

    let mut relationship_defs = String::new();
    for rel_type in RelationshipType::PROMPTED {
        relationship_defs.push_str(&format!(
            "- {}: {}\n",
            rel_type.label(),
            rel_type.definition()
        ));
    }

    format!(
        r#"You are an expert in SAP HANA on VMware systems. Extract structured information from this technical documentation chunk.

SCHEMA DEFINITION:
Entity Types:
{entity_defs}
Relationship Types:
{relationship_defs}
Output MUST be a single valid JSON object with exactly three fields: "entities", "relationships", "chunk_summary". No markdown, no explanations.

EXAMPLE 1:
Text: "NUMA optimization is critical for SAP HANA performance on vSphere. Set numa.nodeAffinity to pin the VM to a single NUMA node."
Output:
{{
  "entities": [
    {{"type": "Concept", "name": "NUMA Optimization", "description": "Aligning VM memory and CPU with physical NUMA topology"}},
    {{"type": "Component", "name": "vSphere", "description": "VMware virtualization platform"}},
    {{"type": "Parameter", "name": "numa.nodeAffinity", "description": "Pins the VM to a specific NUMA node"}}
  ],
  "relationships": [
    {{"from": "NUMA Optimization", "to": "vSphere", "type": "INVOLVES_COMPONENT"}},
    {{"from": "numa.nodeAffinity", "to": "vSphere", "type": "AFFECTS"}}
  ],
  "chunk_summary": "NUMA node affinity settings for SAP HANA VMs on vSphere"
}}

EXAMPLE 2:
Text: "Best practice: reserve all memory for production SAP HANA VMs using sched.mem.min to avoid ballooning."
Output:
{{
  "entities": [
    {{"type": "Recommendation", "name": "Reserve all memory for production VMs", "description": "Full memory reservation avoids ballooning"}},
    {{"type": "Parameter", "name": "sched.mem.min", "description": "Minimum memory reservation for the VM"}},
    {{"type": "Concept", "name": "Memory Management", "description": "How the hypervisor allocates memory to guests"}}
  ],
  "relationships": [
    {{"from": "Reserve all memory for production VMs", "to": "sched.mem.min", "type": "SETS_PARAMETER"}},
    {{"from": "Reserve all memory for production VMs", "to": "Memory Management", "type": "FOR_CONCEPT"}}
  ],
  "chunk_summary": "Memory reservation recommendation for production SAP HANA VMs"
}}

TEXT CHUNK:
{chunk_text}

Focus on SAP HANA performance, VMware configuration, and system optimization concepts.

JSON OUTPUT:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_schema_and_chunk() {
        let prompt = build_extraction_prompt("some chunk text");

        for entity_type in EntityType::PROMPTED {
            assert!(prompt.contains(entity_type.label()));
        }
        for rel_type in RelationshipType::PROMPTED {
            assert!(prompt.contains(rel_type.label()));
        }
        assert!(prompt.contains("some chunk text"));
        assert!(prompt.contains("chunk_summary"));
    }

    #[test]
    fn sentinel_types_are_not_prompted() {
        let prompt = build_extraction_prompt("text");
        assert!(!prompt.contains("Unclassified"));
        assert!(!prompt.contains("RELATED_TO"));
    }
}
