//! Planar GeoJSON intersection for the in-memory store.
//!
//! Coordinates are treated as points in the plane. Boundaries count as part
//! of a polygon, so touching geometries intersect.

use bson::{Bson, Document};

type Point = (f64, f64);

const EPSILON: f64 = 1e-12;

/// A parsed GeoJSON geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point(Point),
    /// Independent positions.
    MultiPoint(Vec<Point>),
    /// A connected path.
    LineString(Vec<Point>),
    /// Independent paths.
    MultiLineString(Vec<Vec<Point>>),
    /// Exterior ring followed by holes.
    Polygon(Vec<Vec<Point>>),
    /// Independent polygons.
    MultiPolygon(Vec<Vec<Vec<Point>>>),
    /// A `GeometryCollection`.
    Collection(Vec<Geometry>),
}

/// Primitive shapes a geometry decomposes into.
enum Part<'a> {
    Point(Point),
    Line(&'a [Point]),
    Polygon(&'a [Vec<Point>]),
}

impl Geometry {
    /// Parses a GeoJSON geometry document.
    pub fn from_document(document: &Document) -> Result<Self, String> {
        let kind = document
            .get_str("type")
            .map_err(|_| "geometry has no type".to_string())?;

        if kind == "GeometryCollection" {
            let members = document
                .get_array("geometries")
                .map_err(|_| "GeometryCollection has no geometries".to_string())?;
            return members
                .iter()
                .map(|m| match m {
                    Bson::Document(d) => Geometry::from_document(d),
                    _ => Err("geometry collection member is not a document".to_string()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Geometry::Collection);
        }

        let coordinates = document
            .get("coordinates")
            .ok_or_else(|| format!("{} has no coordinates", kind))?;

        match kind {
            "Point" => Ok(Geometry::Point(point(coordinates)?)),
            "MultiPoint" => Ok(Geometry::MultiPoint(points(coordinates)?)),
            "LineString" => Ok(Geometry::LineString(points(coordinates)?)),
            "MultiLineString" => Ok(Geometry::MultiLineString(list(coordinates, points)?)),
            "Polygon" => Ok(Geometry::Polygon(rings(coordinates)?)),
            "MultiPolygon" => Ok(Geometry::MultiPolygon(list(coordinates, rings)?)),
            other => Err(format!("unsupported geometry type {}", other)),
        }
    }

    /// Returns true if the two geometries share at least one point.
    pub fn intersects(&self, other: &Geometry) -> bool {
        let mut left = Vec::new();
        self.parts(&mut left);
        let mut right = Vec::new();
        other.parts(&mut right);

        left.iter()
            .any(|a| right.iter().any(|b| parts_intersect(a, b)))
    }

    fn parts<'a>(&'a self, out: &mut Vec<Part<'a>>) {
        match self {
            Geometry::Point(p) => out.push(Part::Point(*p)),
            Geometry::MultiPoint(ps) => out.extend(ps.iter().map(|p| Part::Point(*p))),
            Geometry::LineString(line) => out.push(Part::Line(line)),
            Geometry::MultiLineString(lines) => out.extend(lines.iter().map(|l| Part::Line(l))),
            Geometry::Polygon(rings) => out.push(Part::Polygon(rings)),
            Geometry::MultiPolygon(polygons) => {
                out.extend(polygons.iter().map(|p| Part::Polygon(p)))
            }
            Geometry::Collection(members) => {
                for member in members {
                    member.parts(out);
                }
            }
        }
    }
}

fn number(value: &Bson) -> Result<f64, String> {
    match value {
        Bson::Double(f) => Ok(*f),
        Bson::Int32(i) => Ok(f64::from(*i)),
        Bson::Int64(i) => Ok(*i as f64),
        other => Err(format!("coordinate {} is not a number", other)),
    }
}

fn point(value: &Bson) -> Result<Point, String> {
    match value {
        Bson::Array(xy) if xy.len() >= 2 => Ok((number(&xy[0])?, number(&xy[1])?)),
        other => Err(format!("invalid position {}", other)),
    }
}

fn points(value: &Bson) -> Result<Vec<Point>, String> {
    list(value, point)
}

fn rings(value: &Bson) -> Result<Vec<Vec<Point>>, String> {
    let rings = list(value, points)?;
    if rings.is_empty() || rings.iter().any(|r| r.len() < 4) {
        return Err("polygon rings need at least four positions".to_string());
    }
    Ok(rings)
}

fn list<T>(value: &Bson, item: fn(&Bson) -> Result<T, String>) -> Result<Vec<T>, String> {
    match value {
        Bson::Array(values) => values.iter().map(item).collect(),
        other => Err(format!("expected an array, got {}", other)),
    }
}

fn parts_intersect(a: &Part<'_>, b: &Part<'_>) -> bool {
    match (a, b) {
        (Part::Point(p), Part::Point(q)) => same_point(*p, *q),
        (Part::Point(p), Part::Line(line)) | (Part::Line(line), Part::Point(p)) => {
            point_on_line(*p, line)
        }
        (Part::Point(p), Part::Polygon(rings)) | (Part::Polygon(rings), Part::Point(p)) => {
            point_in_polygon(*p, rings)
        }
        (Part::Line(l), Part::Line(m)) => lines_cross(l, m),
        (Part::Line(line), Part::Polygon(rings)) | (Part::Polygon(rings), Part::Line(line)) => {
            line.iter().any(|p| point_in_polygon(*p, rings))
                || rings.iter().any(|ring| lines_cross(line, ring))
        }
        (Part::Polygon(a), Part::Polygon(b)) => {
            a[0].iter().any(|p| point_in_polygon(*p, b))
                || b[0].iter().any(|p| point_in_polygon(*p, a))
                || a.iter().any(|ra| b.iter().any(|rb| lines_cross(ra, rb)))
        }
    }
}

fn same_point(p: Point, q: Point) -> bool {
    (p.0 - q.0).abs() <= EPSILON && (p.1 - q.1).abs() <= EPSILON
}

fn segments(line: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    line.windows(2).map(|w| (w[0], w[1]))
}

fn point_on_line(p: Point, line: &[Point]) -> bool {
    match line {
        [single] => same_point(p, *single),
        _ => segments(line).any(|(a, b)| on_segment(p, a, b)),
    }
}

fn lines_cross(l: &[Point], m: &[Point]) -> bool {
    segments(l).any(|(a, b)| segments(m).any(|(c, d)| segments_intersect(a, b, c, d)))
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    orientation(a, b, p).abs() <= EPSILON
        && p.0 >= a.0.min(b.0) - EPSILON
        && p.0 <= a.0.max(b.0) + EPSILON
        && p.1 >= a.1.min(b.1) - EPSILON
        && p.1 <= a.1.max(b.1) + EPSILON
}

fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if ((o1 > EPSILON && o2 < -EPSILON) || (o1 < -EPSILON && o2 > EPSILON))
        && ((o3 > EPSILON && o4 < -EPSILON) || (o3 < -EPSILON && o4 > EPSILON))
    {
        return true;
    }

    on_segment(c, a, b) || on_segment(d, a, b) || on_segment(a, c, d) || on_segment(b, c, d)
}

/// Even-odd containment; points on the ring count as inside.
fn point_in_ring(p: Point, ring: &[Point]) -> bool {
    if point_on_line(p, ring) {
        return true;
    }
    let mut inside = false;
    for (a, b) in segments(ring) {
        if (a.1 > p.1) != (b.1 > p.1) {
            let x = a.0 + (p.1 - a.1) * (b.0 - a.0) / (b.1 - a.1);
            if p.0 < x {
                inside = !inside;
            }
        }
    }
    inside
}

fn point_in_polygon(p: Point, rings: &[Vec<Point>]) -> bool {
    let Some((outer, holes)) = rings.split_first() else {
        return false;
    };
    if !point_in_ring(p, outer) {
        return false;
    }
    // a point on a hole's boundary is still on the polygon
    !holes
        .iter()
        .any(|hole| point_in_ring(p, hole) && !point_on_line(p, hole))
}
