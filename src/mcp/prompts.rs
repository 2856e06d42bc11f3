//! Prompts published by `prompts/list`.

use serde_json::{json, Value};

use crate::mcp::protocol::PromptDefinition;

/// Name of the modelling workflow prompt.
pub const ASSET_CREATION_STRATEGY: &str = "asset_creation_strategy";

const ASSET_CREATION_TEXT: &str = "\
Asset Creation Strategy for FreeCAD MCP

When creating content in FreeCAD, always follow these steps:

0. Before starting any task, always use get_objects() to confirm the current state of the document.

1. Utilize the parts library:
   - Check available parts using get_parts_list().
   - If the required part exists in the library, use insert_part_from_library() to insert it into your document.

2. If the appropriate asset is not available in the parts library:
   - Create basic shapes (e.g., cubes, cylinders, spheres) using create_object().
   - Adjust and define detailed properties of the shapes as necessary using edit_object().

3. Always assign clear and descriptive names to objects when adding them to the document.

4. Explicitly set the position, scale, and rotation properties of created or inserted objects using edit_object() to ensure proper spatial relationships.

5. After editing an object, always verify that the set properties have been correctly applied by using get_object().

6. If detailed customization or specialized operations are necessary, use execute_code() to run custom Python scripts.

7. For 2D profiles, use create_sketch() and the sketch_add_* tools, constrain the geometry with sketch_add_constraint(), then leave edit mode with sketch_close_edit().

Only revert to basic creation methods in the following cases:
- When the required asset is not available in the parts library.
- When a basic shape is explicitly requested.
- When creating complex shapes requires custom scripting.
";

/// Every prompt the server offers.
#[must_use]
pub fn prompt_definitions() -> Vec<PromptDefinition> {
    vec![PromptDefinition {
        name: ASSET_CREATION_STRATEGY.to_string(),
        description: Some(
            "Step-by-step strategy for building models in FreeCAD with these tools".to_string(),
        ),
    }]
}

/// The `prompts/get` result for `name`, or `None` if there is no such prompt.
#[must_use]
pub fn get_prompt(name: &str) -> Option<Value> {
    (name == ASSET_CREATION_STRATEGY).then(|| {
        json!({
            "description": "Asset creation strategy for FreeCAD",
            "messages": [{
                "role": "user",
                "content": {"type": "text", "text": ASSET_CREATION_TEXT}
            }]
        })
    })
}
