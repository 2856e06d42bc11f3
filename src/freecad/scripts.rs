//! Python sources sent through `execute_code`.
//!
//! The addon has no direct primitives for sketch geometry and constraints,
//! so those tools build a small script and run it inside FreeCAD. Every user
//! supplied name is emitted as an escaped Python string literal. A missing
//! sketch raises, so FreeCAD reports the call as failed instead of printing a
//! message and succeeding.

use std::fmt::{self, Write as _};
use std::str::FromStr;

/// Marker line printed by [`VIEW_PROBE`].
pub const VIEW_PROBE_MARKER: &str = "MCP_VIEW_PROBE:";

/// Largest side count accepted for a regular polygon.
pub const MAX_POLYGON_SIDES: u32 = 1000;

/// Reports the active view type and whether it can export images.
///
/// Prints `MCP_VIEW_PROBE:<type>|<0 or 1>`, or `MCP_VIEW_PROBE:<none>`
/// without an active view.
pub const VIEW_PROBE: &str = r#"import FreeCADGui

gui_doc = FreeCADGui.ActiveDocument
view = gui_doc.ActiveView if gui_doc else None
if view is None:
    print("MCP_VIEW_PROBE:<none>")
else:
    print("MCP_VIEW_PROBE:%s|%d" % (type(view).__name__, int(hasattr(view, "saveImage"))))
"#;

/// Quotes `s` as a Python string literal.
#[must_use]
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Formats a finite float as a Python float literal.
fn py_float(value: f64) -> String {
    format!("{value:?}")
}

/// Sketch placement plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// The XY plane.
    Xy,
    /// The XZ plane.
    Xz,
    /// The YZ plane.
    Yz,
}

impl Plane {
    /// Plane name as FreeCAD spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xy => "XY",
            Self::Xz => "XZ",
            Self::Yz => "YZ",
        }
    }

    /// Quaternion `(x, y, z, w)` turning the XY plane into this one.
    const fn quaternion(self) -> &'static str {
        match self {
            Self::Xy => "0, 0, 0, 1",
            Self::Xz => "0.7071067811865476, 0, 0, 0.7071067811865476",
            Self::Yz => "0.5, 0.5, 0.5, 0.5",
        }
    }
}

impl FromStr for Plane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "XY" => Ok(Self::Xy),
            "XZ" => Ok(Self::Xz),
            "YZ" => Ok(Self::Yz),
            other => Err(format!("Invalid plane '{other}'. Must be one of: XY, XZ, YZ")),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creates a sketch and opens it for editing.
///
/// With `body_name`, the sketch goes into that `PartDesign::Body` (created if
/// missing) and is attached to the body's origin plane.
#[must_use]
pub fn create_sketch(
    doc_name: &str,
    sketch_name: &str,
    plane: Plane,
    body_name: Option<&str>,
) -> String {
    let doc = py_str(doc_name);
    let sketch = py_str(sketch_name);

    body_name.map_or_else(
        || {
            format!(
                r"import FreeCAD
import FreeCADGui
import Sketcher

doc = FreeCAD.getDocument({doc})
sketch = doc.addObject('Sketcher::SketchObject', {sketch})
sketch.Placement = FreeCAD.Placement(FreeCAD.Vector(0, 0, 0), FreeCAD.Rotation({rotation}))
doc.recompute()
FreeCADGui.ActiveDocument.setEdit(sketch.Name)
print('Sketch ' + sketch.Name + ' created')
",
                rotation = plane.quaternion(),
            )
        },
        |body_name| {
            let body = py_str(body_name);
            let role = py_str(&format!("{}_Plane", plane.as_str()));
            format!(
                r"import FreeCAD
import FreeCADGui
import Sketcher

doc = FreeCAD.getDocument({doc})
body = doc.getObject({body})
if body is None:
    body = doc.addObject('PartDesign::Body', {body})
sketch = body.newObject('Sketcher::SketchObject', {sketch})
origin_plane = [f for f in body.Origin.OriginFeatures if f.Role == {role}][0]
if hasattr(sketch, 'AttachmentSupport'):
    sketch.AttachmentSupport = (origin_plane, [''])
else:
    sketch.Support = (origin_plane, [''])
sketch.MapMode = 'FlatFace'
doc.recompute()
FreeCADGui.ActiveDocument.setEdit(sketch.Name)
print('Sketch ' + sketch.Name + ' created in ' + body.Name)
"
            )
        },
    )
}

/// A sketch addressed by document and object name.
#[derive(Debug, Clone, Copy)]
pub struct SketchRef<'a> {
    /// Document containing the sketch.
    pub doc_name: &'a str,
    /// Sketch object name.
    pub sketch_name: &'a str,
}

impl<'a> SketchRef<'a> {
    /// Creates a reference.
    #[must_use]
    pub const fn new(doc_name: &'a str, sketch_name: &'a str) -> Self {
        Self {
            doc_name,
            sketch_name,
        }
    }

    /// Imports, document lookup and the missing-sketch check.
    fn preamble(&self, imports: &[&str]) -> String {
        let mut script = String::new();
        for module in imports {
            let _ = writeln!(script, "import {module}");
        }
        let missing = py_str(&format!(
            "Sketch '{}' not found in document '{}'",
            self.sketch_name, self.doc_name
        ));
        let _ = write!(
            script,
            "\ndoc = FreeCAD.getDocument({doc})\n\
             sketch = doc.getObject({sketch})\n\
             if sketch is None:\n    raise ValueError({missing})\n",
            doc = py_str(self.doc_name),
            sketch = py_str(self.sketch_name),
        );
        script
    }

    /// Adds a construction point.
    #[must_use]
    pub fn add_point(&self, x: f64, y: f64) -> String {
        let mut script = self.preamble(&["FreeCAD", "Part"]);
        let _ = write!(
            script,
            "sketch.addGeometry(Part.Point(FreeCAD.Vector({x}, {y}, 0)))\n\
             doc.recompute()\n",
            x = py_float(x),
            y = py_float(y),
        );
        script
    }

    /// Adds a line segment.
    #[must_use]
    pub fn add_line(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> String {
        let mut script = self.preamble(&["FreeCAD", "Part"]);
        let _ = write!(
            script,
            "sketch.addGeometry(Part.LineSegment(FreeCAD.Vector({x1}, {y1}, 0), FreeCAD.Vector({x2}, {y2}, 0)))\n\
             doc.recompute()\n",
            x1 = py_float(x1),
            y1 = py_float(y1),
            x2 = py_float(x2),
            y2 = py_float(y2),
        );
        script
    }

    /// Adds a full circle.
    #[must_use]
    pub fn add_circle(&self, center_x: f64, center_y: f64, radius: f64) -> String {
        let mut script = self.preamble(&["FreeCAD", "Part"]);
        let _ = write!(
            script,
            "sketch.addGeometry(Part.Circle(FreeCAD.Vector({cx}, {cy}, 0), FreeCAD.Vector(0, 0, 1), {r}))\n\
             doc.recompute()\n",
            cx = py_float(center_x),
            cy = py_float(center_y),
            r = py_float(radius),
        );
        script
    }

    /// Adds a circular arc; angles are in degrees.
    #[must_use]
    pub fn add_arc(
        &self,
        center_x: f64,
        center_y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    ) -> String {
        let mut script = self.preamble(&["FreeCAD", "Part", "math"]);
        let _ = write!(
            script,
            "circle = Part.Circle(FreeCAD.Vector({cx}, {cy}, 0), FreeCAD.Vector(0, 0, 1), {r})\n\
             sketch.addGeometry(Part.ArcOfCircle(circle, math.radians({start}), math.radians({end})))\n\
             doc.recompute()\n",
            cx = py_float(center_x),
            cy = py_float(center_y),
            r = py_float(radius),
            start = py_float(start_angle),
            end = py_float(end_angle),
        );
        script
    }

    /// Adds an axis-aligned rectangle: four lines joined corner to corner,
    /// two kept horizontal and two vertical.
    #[must_use]
    pub fn add_rectangle(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> String {
        let corners = [(x1, y1), (x2, y1), (x2, y2), (x1, y2)];
        let mut script = self.preamble(&["FreeCAD", "Part", "Sketcher"]);
        let _ = writeln!(script, "{}", polygon_body(&corners, true));
        script.push_str(
            "sketch.addConstraint(Sketcher.Constraint('Horizontal', geo[0]))\n\
             sketch.addConstraint(Sketcher.Constraint('Vertical', geo[1]))\n\
             sketch.addConstraint(Sketcher.Constraint('Horizontal', geo[2]))\n\
             sketch.addConstraint(Sketcher.Constraint('Vertical', geo[3]))\n\
             doc.recompute()\n",
        );
        script
    }

    /// Adds connected line segments through `points`, optionally closed.
    #[must_use]
    pub fn add_polyline(&self, points: &[(f64, f64)], closed: bool) -> String {
        let mut script = self.preamble(&["FreeCAD", "Part", "Sketcher"]);
        let _ = writeln!(script, "{}", polygon_body(points, closed));
        script.push_str("doc.recompute()\n");
        script
    }

    /// Adds an ellipse whose major axis is rotated by `angle` degrees.
    #[must_use]
    pub fn add_ellipse(
        &self,
        center_x: f64,
        center_y: f64,
        major_radius: f64,
        minor_radius: f64,
        angle: f64,
    ) -> String {
        let mut script = self.preamble(&["FreeCAD", "Part", "math"]);
        let _ = write!(
            script,
            "cx, cy = {cx}, {cy}\n\
             major_r, minor_r = {major}, {minor}\n\
             a = math.radians({angle})\n\
             center = FreeCAD.Vector(cx, cy, 0)\n\
             major = FreeCAD.Vector(cx + major_r * math.cos(a), cy + major_r * math.sin(a), 0)\n\
             minor = FreeCAD.Vector(cx - minor_r * math.sin(a), cy + minor_r * math.cos(a), 0)\n\
             sketch.addGeometry(Part.Ellipse(major, minor, center))\n\
             doc.recompute()\n",
            cx = py_float(center_x),
            cy = py_float(center_y),
            major = py_float(major_radius),
            minor = py_float(minor_radius),
            angle = py_float(angle),
        );
        script
    }

    /// Adds a closed regular polygon inscribed in a circle of `radius`;
    /// `sides` should be at most [`MAX_POLYGON_SIDES`];
    /// the first vertex sits at `angle` degrees.
    #[must_use]
    pub fn add_regular_polygon(
        &self,
        center_x: f64,
        center_y: f64,
        radius: f64,
        sides: u32,
        angle: f64,
    ) -> String {
        let offset = angle.to_radians();
        let step = std::f64::consts::TAU / f64::from(sides);
        let vertices: Vec<(f64, f64)> = (0..sides)
            .map(|i| {
                let theta = f64::from(i).mul_add(step, offset);
                (
                    radius.mul_add(theta.cos(), center_x),
                    radius.mul_add(theta.sin(), center_y),
                )
            })
            .collect();
        self.add_polyline(&vertices, true)
    }

    /// Adds one constraint.
    #[must_use]
    pub fn add_constraint(&self, constraint: &Constraint) -> String {
        let mut script = self.preamble(&["FreeCAD", "Sketcher", "math"]);
        let _ = write!(
            script,
            "sketch.addConstraint(Sketcher.Constraint({args}))\n\
             doc.recompute()\n",
            args = constraint.arguments(),
        );
        script
    }

    /// Leaves sketch edit mode.
    #[must_use]
    pub fn close_edit(&self) -> String {
        let mut script = self.preamble(&["FreeCAD", "FreeCADGui"]);
        script.push_str("FreeCADGui.ActiveDocument.resetEdit()\ndoc.recompute()\n");
        script
    }
}

/// Lines through `points` plus coincident constraints at every joint.
/// Leaves the geometry indices in `geo`.
fn polygon_body(points: &[(f64, f64)], closed: bool) -> String {
    let list = points
        .iter()
        .map(|(x, y)| format!("({}, {})", py_float(*x), py_float(*y)))
        .collect::<Vec<_>>()
        .join(", ");
    let closed = if closed { "True" } else { "False" };

    format!(
        "points = [{list}]\n\
         closed = {closed}\n\
         segments = list(zip(points, points[1:]))\n\
         if closed:\n    segments.append((points[-1], points[0]))\n\
         geo = []\n\
         for (ax, ay), (bx, by) in segments:\n    \
         geo.append(sketch.addGeometry(Part.LineSegment(FreeCAD.Vector(ax, ay, 0), FreeCAD.Vector(bx, by, 0))))\n\
         for i in range(len(geo) - 1):\n    \
         sketch.addConstraint(Sketcher.Constraint('Coincident', geo[i], 2, geo[i + 1], 1))\n\
         if closed and len(geo) > 2:\n    \
         sketch.addConstraint(Sketcher.Constraint('Coincident', geo[-1], 2, geo[0], 1))"
    )
}

/// Sketcher constraint types the tools accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Line is horizontal.
    Horizontal,
    /// Line is vertical.
    Vertical,
    /// Two lines are parallel.
    Parallel,
    /// Two lines are perpendicular.
    Perpendicular,
    /// Two curves are tangent.
    Tangent,
    /// Two edges have equal length or radius.
    Equal,
    /// Two points are symmetric about a line.
    Symmetric,
    /// Distance between two points.
    Distance,
    /// Radius of a circle or arc.
    Radius,
    /// Angle between two lines, in degrees.
    Angle,
    /// Two points coincide.
    Coincident,
    /// A point lies on a curve.
    PointOnObject,
}

impl ConstraintKind {
    /// Every accepted type, in the order the tool schema lists them.
    pub const ALL: [Self; 12] = [
        Self::Horizontal,
        Self::Vertical,
        Self::Parallel,
        Self::Perpendicular,
        Self::Tangent,
        Self::Equal,
        Self::Symmetric,
        Self::Distance,
        Self::Radius,
        Self::Angle,
        Self::Coincident,
        Self::PointOnObject,
    ];

    /// Sketcher's name for the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "Horizontal",
            Self::Vertical => "Vertical",
            Self::Parallel => "Parallel",
            Self::Perpendicular => "Perpendicular",
            Self::Tangent => "Tangent",
            Self::Equal => "Equal",
            Self::Symmetric => "Symmetric",
            Self::Distance => "Distance",
            Self::Radius => "Radius",
            Self::Angle => "Angle",
            Self::Coincident => "Coincident",
            Self::PointOnObject => "PointOnObject",
        }
    }

    /// `(geometry indices, point indices, needs value)`.
    const fn arity(self) -> (usize, usize, bool) {
        match self {
            Self::Horizontal | Self::Vertical => (1, 0, false),
            Self::Parallel | Self::Perpendicular | Self::Tangent | Self::Equal => (2, 0, false),
            Self::Coincident => (2, 2, false),
            Self::Distance => (2, 2, true),
            Self::Radius => (1, 0, true),
            Self::Angle => (2, 0, true),
            Self::Symmetric => (3, 2, false),
            Self::PointOnObject => (2, 1, false),
        }
    }
}

impl FromStr for ConstraintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown constraint type '{s}'"))
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A constraint whose indices and value match its type.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    kind: ConstraintKind,
    geometry: Vec<i64>,
    points: Vec<i64>,
    value: Option<f64>,
}

impl Constraint {
    /// Checks the inputs against what `kind` takes.
    ///
    /// Point indices and a value are ignored by types that do not use them.
    ///
    /// # Errors
    ///
    /// Returns a message naming what is missing or wrong.
    pub fn new(
        kind: ConstraintKind,
        geometry: Vec<i64>,
        points: Vec<i64>,
        value: Option<f64>,
    ) -> Result<Self, String> {
        let (geo_count, point_count, needs_value) = kind.arity();

        if geometry.len() != geo_count {
            return Err(format!(
                "{kind} constraint needs exactly {geo_count} geometry index(es), got {}",
                geometry.len()
            ));
        }
        if points.len() < point_count {
            return Err(format!(
                "{kind} constraint needs {point_count} point index(es), got {}",
                points.len()
            ));
        }
        let value = if needs_value {
            match value {
                Some(v) if v.is_finite() => Some(v),
                Some(_) => return Err(format!("{kind} constraint value must be finite")),
                None => return Err(format!("{kind} constraint needs a value")),
            }
        } else {
            None
        };

        let mut points = points;
        points.truncate(point_count);

        Ok(Self {
            kind,
            geometry,
            points,
            value,
        })
    }

    /// Constraint type.
    #[must_use]
    pub const fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Argument list for `Sketcher.Constraint(...)`.
    fn arguments(&self) -> String {
        let g = &self.geometry;
        let p = &self.points;
        let mut args: Vec<String> = vec![py_str(self.kind.as_str())];

        match self.kind {
            ConstraintKind::Coincident | ConstraintKind::Distance => {
                args.extend([g[0], p[0], g[1], p[1]].map(|i| i.to_string()));
            }
            ConstraintKind::Symmetric => {
                args.extend([g[0], p[0], g[1], p[1], g[2]].map(|i| i.to_string()));
            }
            ConstraintKind::PointOnObject => {
                args.extend([g[0], p[0], g[1]].map(|i| i.to_string()));
            }
            _ => args.extend(g.iter().map(ToString::to_string)),
        }

        match (self.kind, self.value) {
            (ConstraintKind::Angle, Some(v)) => args.push(format!("math.radians({})", py_float(v))),
            (_, Some(v)) => args.push(py_float(v)),
            (_, None) => {}
        }

        args.join(", ")
    }
}
