//! Tool catalogue published by `tools/list`.

use serde_json::{json, Value};

use crate::feedback::VIEW_NAMES;
use crate::freecad::scripts::{ConstraintKind, MAX_POLYGON_SIDES};
use crate::mcp::protocol::ToolDefinition;

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

/// `doc_name` and `sketch_name` plus the given extra properties.
fn sketch_schema(extra: Value, extra_required: &[&str]) -> Value {
    let mut properties = json!({
        "doc_name": {
            "type": "string",
            "description": "Name of the document containing the sketch"
        },
        "sketch_name": {
            "type": "string",
            "description": "Name of the sketch"
        }
    });
    if let (Some(props), Value::Object(extra)) = (properties.as_object_mut(), extra) {
        props.extend(extra);
    }

    let mut required = vec!["doc_name", "sketch_name"];
    required.extend_from_slice(extra_required);

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn number(description: &str) -> Value {
    json!({"type": "number", "description": description})
}

/// Every tool the server offers.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let constraint_types: Vec<&str> = ConstraintKind::ALL.iter().map(|k| k.as_str()).collect();

    vec![
        // === Documents and objects ===
        tool(
            "create_document",
            "Create a new document in FreeCAD.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Name of the document to create"}
                },
                "required": ["name"]
            }),
        ),
        tool(
            "create_object",
            "Create a new object in FreeCAD. The type id starts with 'Part::', 'Draft::', \
             'PartDesign::' or 'Fem::', e.g. 'Part::Box', 'Part::Cylinder', 'Draft::Circle', \
             'Fem::ConstraintFixed'. Properties are set after creation; 'Placement' takes \
             {\"Base\": {\"x\", \"y\", \"z\"}, \"Rotation\": {\"Axis\": {\"x\", \"y\", \"z\"}, \"Angle\"}} \
             and 'ViewObject' takes view properties such as 'ShapeColor'. FEM objects other \
             than the analysis itself go into the analysis named by analysis_name. \
             Returns a status message and a screenshot of the active view.",
            json!({
                "type": "object",
                "properties": {
                    "doc_name": {"type": "string", "description": "Document to create the object in"},
                    "obj_type": {"type": "string", "description": "FreeCAD type id of the object"},
                    "obj_name": {"type": "string", "description": "Name of the new object"},
                    "analysis_name": {
                        "type": "string",
                        "description": "Optional: FEM analysis to add the object to"
                    },
                    "obj_properties": {
                        "type": "object",
                        "description": "Optional: initial property values",
                        "additionalProperties": true
                    }
                },
                "required": ["doc_name", "obj_type", "obj_name"]
            }),
        ),
        tool(
            "edit_object",
            "Set properties on an existing object. Use this when create_object cannot set \
             everything at creation time. Returns a status message and a screenshot.",
            json!({
                "type": "object",
                "properties": {
                    "doc_name": {"type": "string", "description": "Document containing the object"},
                    "obj_name": {"type": "string", "description": "Object to edit"},
                    "obj_properties": {
                        "type": "object",
                        "description": "Property values to set",
                        "additionalProperties": true
                    }
                },
                "required": ["doc_name", "obj_name", "obj_properties"]
            }),
        ),
        tool(
            "delete_object",
            "Delete an object from a document. Returns a status message and a screenshot.",
            json!({
                "type": "object",
                "properties": {
                    "doc_name": {"type": "string", "description": "Document containing the object"},
                    "obj_name": {"type": "string", "description": "Object to delete"}
                },
                "required": ["doc_name", "obj_name"]
            }),
        ),
        tool(
            "execute_code",
            "Execute arbitrary Python code inside FreeCAD. Returns the printed output and a \
             screenshot.",
            json!({
                "type": "object",
                "properties": {
                    "code": {"type": "string", "description": "Python source to run"}
                },
                "required": ["code"]
            }),
        ),
        tool(
            "get_view",
            "Get a screenshot of the active view from the given camera angle.",
            json!({
                "type": "object",
                "properties": {
                    "view_name": {
                        "type": "string",
                        "enum": VIEW_NAMES,
                        "description": "Camera angle"
                    }
                },
                "required": ["view_name"]
            }),
        ),
        tool(
            "insert_part_from_library",
            "Insert a part from the parts library addon. Use get_parts_list to find paths.",
            json!({
                "type": "object",
                "properties": {
                    "relative_path": {
                        "type": "string",
                        "description": "Path of the part relative to the library root"
                    }
                },
                "required": ["relative_path"]
            }),
        ),
        tool(
            "get_objects",
            "List every object in a document with its properties, to see what can be checked \
             or edited. Also returns a screenshot.",
            json!({
                "type": "object",
                "properties": {
                    "doc_name": {"type": "string", "description": "Document to inspect"}
                },
                "required": ["doc_name"]
            }),
        ),
        tool(
            "get_object",
            "Get one object and its properties. Also returns a screenshot.",
            json!({
                "type": "object",
                "properties": {
                    "doc_name": {"type": "string", "description": "Document containing the object"},
                    "obj_name": {"type": "string", "description": "Object to inspect"}
                },
                "required": ["doc_name", "obj_name"]
            }),
        ),
        tool(
            "get_parts_list",
            "List the parts available in the parts library addon.",
            json!({"type": "object", "properties": {}}),
        ),
        tool(
            "list_documents",
            "List the names of the documents open in FreeCAD.",
            json!({"type": "object", "properties": {}}),
        ),
        // === Sketcher ===
        tool(
            "create_sketch",
            "Create a sketch on the XY, XZ or YZ plane and open it for editing. With \
             body_name the sketch goes into that PartDesign body (created if missing) and is \
             attached to its origin plane.",
            json!({
                "type": "object",
                "properties": {
                    "doc_name": {"type": "string", "description": "Document to create the sketch in"},
                    "sketch_name": {"type": "string", "description": "Name of the new sketch"},
                    "plane": {
                        "type": "string",
                        "enum": ["XY", "XZ", "YZ"],
                        "default": "XY",
                        "description": "Sketch plane"
                    },
                    "body_name": {
                        "type": "string",
                        "description": "Optional: PartDesign body to create the sketch in"
                    }
                },
                "required": ["doc_name", "sketch_name"]
            }),
        ),
        tool(
            "sketch_add_point",
            "Add a point to a sketch.",
            sketch_schema(
                json!({"x": number("X coordinate"), "y": number("Y coordinate")}),
                &["x", "y"],
            ),
        ),
        tool(
            "sketch_add_line",
            "Add a line segment to a sketch.",
            sketch_schema(
                json!({
                    "x1": number("Start X"),
                    "y1": number("Start Y"),
                    "x2": number("End X"),
                    "y2": number("End Y")
                }),
                &["x1", "y1", "x2", "y2"],
            ),
        ),
        tool(
            "sketch_add_circle",
            "Add a circle to a sketch.",
            sketch_schema(
                json!({
                    "center_x": number("Center X"),
                    "center_y": number("Center Y"),
                    "radius": number("Radius, greater than zero")
                }),
                &["center_x", "center_y", "radius"],
            ),
        ),
        tool(
            "sketch_add_arc",
            "Add a circular arc to a sketch. Angles are in degrees, counter-clockwise from \
             the X axis.",
            sketch_schema(
                json!({
                    "center_x": number("Center X"),
                    "center_y": number("Center Y"),
                    "radius": number("Radius, greater than zero"),
                    "start_angle": number("Start angle in degrees"),
                    "end_angle": number("End angle in degrees")
                }),
                &["center_x", "center_y", "radius", "start_angle", "end_angle"],
            ),
        ),
        tool(
            "sketch_add_rectangle",
            "Add an axis-aligned rectangle given two opposite corners. The four edges are \
             joined at the corners and kept horizontal and vertical.",
            sketch_schema(
                json!({
                    "x1": number("First corner X"),
                    "y1": number("First corner Y"),
                    "x2": number("Opposite corner X"),
                    "y2": number("Opposite corner Y")
                }),
                &["x1", "y1", "x2", "y2"],
            ),
        ),
        tool(
            "sketch_add_polyline",
            "Add connected line segments through a list of points, optionally closing the \
             shape back to the first point.",
            sketch_schema(
                json!({
                    "points": {
                        "type": "array",
                        "minItems": 2,
                        "items": {
                            "type": "object",
                            "properties": {
                                "x": {"type": "number"},
                                "y": {"type": "number"}
                            },
                            "required": ["x", "y"]
                        },
                        "description": "Vertices in order"
                    },
                    "closed": {
                        "type": "boolean",
                        "default": false,
                        "description": "Join the last point back to the first"
                    }
                }),
                &["points"],
            ),
        ),
        tool(
            "sketch_add_ellipse",
            "Add an ellipse to a sketch.",
            sketch_schema(
                json!({
                    "center_x": number("Center X"),
                    "center_y": number("Center Y"),
                    "major_radius": number("Major radius, not smaller than the minor radius"),
                    "minor_radius": number("Minor radius, greater than zero"),
                    "angle": {
                        "type": "number",
                        "default": 0,
                        "description": "Rotation of the major axis in degrees"
                    }
                }),
                &["center_x", "center_y", "major_radius", "minor_radius"],
            ),
        ),
        tool(
            "sketch_add_regular_polygon",
            "Add a closed regular polygon inscribed in a circle.",
            sketch_schema(
                json!({
                    "center_x": number("Center X"),
                    "center_y": number("Center Y"),
                    "radius": number("Circumradius, greater than zero"),
                    "sides": {
                        "type": "integer",
                        "minimum": 3,
                        "maximum": MAX_POLYGON_SIDES,
                        "description": "Number of sides"
                    },
                    "angle": {
                        "type": "number",
                        "default": 0,
                        "description": "Angle of the first vertex in degrees"
                    }
                }),
                &["center_x", "center_y", "radius", "sides"],
            ),
        ),
        tool(
            "sketch_add_constraint",
            "Add a geometric constraint. Geometry indices count from 0 in creation order. \
             Point indices: 1 = start, 2 = end, 3 = center. Horizontal and Vertical take one \
             geometry; Parallel, Perpendicular, Tangent and Equal take two; Coincident takes \
             two geometries and two points; Distance adds a value to that; Radius takes one \
             geometry and a value; Angle takes two geometries and a value in degrees; \
             Symmetric takes three geometries (the last is the symmetry line) and two points; \
             PointOnObject takes a geometry with one point and the target geometry.",
            sketch_schema(
                json!({
                    "constraint_type": {
                        "type": "string",
                        "enum": constraint_types,
                        "description": "Constraint type"
                    },
                    "geometry_indices": {
                        "type": "array",
                        "items": {"type": "integer"},
                        "description": "Geometries the constraint applies to"
                    },
                    "point_indices": {
                        "type": "array",
                        "items": {"type": "integer"},
                        "description": "Optional: point positions on those geometries"
                    },
                    "value": {
                        "type": "number",
                        "description": "Optional: distance, radius or angle in degrees"
                    }
                }),
                &["constraint_type", "geometry_indices"],
            ),
        ),
        tool(
            "sketch_close_edit",
            "Leave sketch edit mode and recompute the document.",
            sketch_schema(json!({}), &[]),
        ),
    ]
}
