//! Workflow template handling.
//!
//! The template is a ComfyUI node graph (JSON keyed by node id) loaded
//! once at startup and treated as immutable from then on. Each
//! generation materializes a fresh deep copy with exactly the
//! designated nodes patched, so concurrent generations never share a
//! mutated graph.

use std::path::Path;

use serde_json::Value;

use crate::error::ComfyUIError;

/// Filename prefix the output-save node is patched with.
const OUTPUT_PREFIX: &str = "pencil_flux";

/// Ids of the designated nodes in the workflow graph.
///
/// These are configuration, not literals, so an alternate backend graph
/// can be substituted without code changes. The defaults match the
/// stock template shipped with the service.
#[derive(Debug, Clone)]
pub struct WorkflowNodes {
    /// LoadImage node receiving the uploaded input filename.
    pub image_input: String,
    /// Positive-prompt text encode node.
    pub positive_prompt: String,
    /// Noise node whose `noise_seed` input is always set explicitly.
    pub seed: String,
    /// Scheduler node carrying the step count.
    pub steps: String,
    /// SaveImage node whose outputs hold the artifact descriptor.
    pub output_save: String,
}

impl Default for WorkflowNodes {
    fn default() -> Self {
        Self {
            image_input: "1".into(),
            positive_prompt: "6".into(),
            seed: "8".into(),
            steps: "10".into(),
            output_save: "14".into(),
        }
    }
}

/// An immutable, validated workflow graph.
#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    graph: Value,
    nodes: WorkflowNodes,
}

impl WorkflowTemplate {
    /// Load and validate a template from a JSON file.
    pub fn load(path: &Path, nodes: WorkflowNodes) -> Result<Self, ComfyUIError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ComfyUIError::Template(format!("cannot read {}: {e}", path.display()))
        })?;
        let graph: Value = serde_json::from_str(&text)
            .map_err(|e| ComfyUIError::Template(format!("{}: {e}", path.display())))?;
        Self::from_value(graph, nodes)
    }

    /// Validate an in-memory graph: every designated node must exist
    /// and carry an `inputs` object.
    pub fn from_value(graph: Value, nodes: WorkflowNodes) -> Result<Self, ComfyUIError> {
        if !graph.is_object() {
            return Err(ComfyUIError::Template(
                "template root must be a JSON object keyed by node id".into(),
            ));
        }
        for id in [
            &nodes.image_input,
            &nodes.positive_prompt,
            &nodes.seed,
            &nodes.steps,
            &nodes.output_save,
        ] {
            if !graph
                .get(id)
                .and_then(|n| n.get("inputs"))
                .is_some_and(Value::is_object)
            {
                return Err(ComfyUIError::Template(format!(
                    "designated node {id} missing or has no inputs object"
                )));
            }
        }
        Ok(Self { graph, nodes })
    }

    pub fn nodes(&self) -> &WorkflowNodes {
        &self.nodes
    }

    /// Produce a deep copy of the graph with the designated node inputs
    /// overwritten. The template itself is never mutated.
    pub fn materialize(
        &self,
        image_filename: &str,
        prompt: &str,
        steps: u32,
        seed: u64,
    ) -> Value {
        let mut graph = self.graph.clone();
        // Validated at construction, so these indexes cannot miss.
        graph[&self.nodes.image_input]["inputs"]["image"] = image_filename.into();
        graph[&self.nodes.positive_prompt]["inputs"]["text"] = prompt.into();
        graph[&self.nodes.seed]["inputs"]["noise_seed"] = seed.into();
        graph[&self.nodes.steps]["inputs"]["steps"] = steps.into();
        graph[&self.nodes.output_save]["inputs"]["filename_prefix"] = OUTPUT_PREFIX.into();
        graph
    }
}

/// Draw a seed from a uniform random source.
///
/// Kept below 2^53 so the value survives JSON number round-trips
/// through backends that parse numbers as doubles.
pub fn random_seed() -> u64 {
    rand::random_range(0..(1u64 << 53))
}
