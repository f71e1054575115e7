//! 3D convex hull (quickhull).
//!
//! Starts from a non-degenerate tetrahedron whose faces carry the points
//! lying outside them. Each step takes the farthest outside point of a
//! face, grows the region of faces that see it across shared edges, and
//! closes the hole with a fan of faces around the horizon. New faces keep
//! the winding of the horizon edge they replace, so orientation never
//! depends on a nearly flat normal.
//!
//! Faces are stored as outward-facing planes `n·x ≤ d`, which is all the
//! containment test needs.

use std::collections::{HashMap, HashSet};

use nalgebra::Vector3;

use crate::core::types::{Point3D, PointCloud3D};

/// Planes closer than this are treated as touching (meters).
const PLANE_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone)]
struct Face {
    /// Counter-clockwise seen from outside
    vertices: [usize; 3],
    normal: Vector3<f32>,
    offset: f32,
    /// Input points strictly above this face, only while building
    outside: Vec<usize>,
}

impl Face {
    fn new(points: &[Vector3<f32>], vertices: [usize; 3]) -> Self {
        let [a, b, c] = vertices;
        let normal = (points[b] - points[a]).cross(&(points[c] - points[a]));
        let norm = normal.norm();
        // a sliver keeps its place in the mesh but never sees a point
        let normal = if norm > f32::EPSILON {
            normal / norm
        } else {
            Vector3::zeros()
        };
        Self {
            vertices,
            normal,
            offset: normal.dot(&points[a]),
            outside: Vec::new(),
        }
    }

    #[inline]
    fn signed_distance(&self, p: &Vector3<f32>) -> f32 {
        self.normal.dot(p) - self.offset
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.vertices;
        [(a, b), (b, c), (c, a)]
    }
}

/// Face storage with a directed-edge index for neighbour lookup.
#[derive(Default)]
struct Mesh {
    faces: Vec<Option<Face>>,
    edges: HashMap<(usize, usize), usize>,
}

impl Mesh {
    fn insert(&mut self, face: Face) -> usize {
        let id = self.faces.len();
        for edge in face.edges() {
            self.edges.insert(edge, id);
        }
        self.faces.push(Some(face));
        id
    }

    fn remove(&mut self, id: usize) -> Option<Face> {
        let face = self.faces.get_mut(id)?.take()?;
        for edge in face.edges() {
            if self.edges.get(&edge) == Some(&id) {
                self.edges.remove(&edge);
            }
        }
        Some(face)
    }

    fn face(&self, id: usize) -> Option<&Face> {
        self.faces.get(id).and_then(Option::as_ref)
    }

    /// Face across the directed edge `(u, v)`.
    fn neighbour(&self, (u, v): (usize, usize)) -> Option<usize> {
        self.edges.get(&(v, u)).copied()
    }

    /// Hand each point to the first face it lies above, trying `preferred`
    /// first. Points below every face are inside the hull and dropped.
    fn assign(&mut self, points: &[Vector3<f32>], preferred: &[usize], pending: Vec<usize>) {
        for i in pending {
            let p = &points[i];
            let above = |id: &usize| {
                self.face(*id)
                    .is_some_and(|f| f.signed_distance(p) > PLANE_EPSILON)
            };
            let target = preferred
                .iter()
                .copied()
                .find(|id| above(id))
                .or_else(|| (0..self.faces.len()).find(|id| above(id)));
            if let Some(id) = target
                && let Some(face) = self.faces[id].as_mut()
            {
                face.outside.push(i);
            }
        }
    }

    /// Next face with outside points and its farthest point.
    fn next_eye(&self, points: &[Vector3<f32>]) -> Option<(usize, usize)> {
        self.faces.iter().enumerate().find_map(|(id, face)| {
            let face = face.as_ref()?;
            let eye = face.outside.iter().copied().max_by(|&i, &j| {
                face.signed_distance(&points[i])
                    .total_cmp(&face.signed_distance(&points[j]))
            })?;
            Some((id, eye))
        })
    }

    /// Faces seeing `eye`, connected to `start` through shared edges.
    fn visible_from(&self, start: usize, eye: &Vector3<f32>) -> HashSet<usize> {
        let mut visible = HashSet::from([start]);
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(face) = self.face(id) else {
                continue;
            };
            for edge in face.edges() {
                if let Some(next) = self.neighbour(edge)
                    && !visible.contains(&next)
                    && self
                        .face(next)
                        .is_some_and(|f| f.signed_distance(eye) > PLANE_EPSILON)
                {
                    visible.insert(next);
                    stack.push(next);
                }
            }
        }
        visible
    }
}

/// Closed convex polytope enclosing a point set.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    vertices: Vec<Point3D>,
    faces: Vec<Face>,
}

impl ConvexHull {
    /// Hull of `cloud`, using at most `max_points` evenly strided samples.
    ///
    /// Returns `None` when the samples are coplanar (or nearly so) and
    /// no volume can be enclosed.
    pub fn from_cloud(cloud: &PointCloud3D, max_points: usize) -> Option<Self> {
        let stride = cloud.len().div_ceil(max_points.max(4)).max(1);
        let points: Vec<Vector3<f32>> = cloud
            .iter()
            .step_by(stride)
            .filter(|p| p.is_finite())
            .map(|p| Vector3::new(p.x, p.y, p.z))
            .collect();
        Self::from_points(&points)
    }

    fn from_points(points: &[Vector3<f32>]) -> Option<Self> {
        let seed = initial_simplex(points)?;
        let interior = seed.iter().map(|&i| points[i]).sum::<Vector3<f32>>() / 4.0;

        let mut mesh = Mesh::default();
        let [a, b, c, d] = seed;
        for tri in [[a, b, c], [a, b, d], [a, c, d], [b, c, d]] {
            mesh.insert(Face::new(points, outward(points, tri, &interior)));
        }
        let rest = (0..points.len()).filter(|i| !seed.contains(i)).collect();
        mesh.assign(points, &[0, 1, 2, 3], rest);

        while let Some((start, eye)) = mesh.next_eye(points) {
            let visible = mesh.visible_from(start, &points[eye]);

            let mut horizon = Vec::new();
            for &id in &visible {
                if let Some(face) = mesh.face(id) {
                    horizon.extend(face.edges().into_iter().filter(|&edge| {
                        mesh.neighbour(edge).is_none_or(|n| !visible.contains(&n))
                    }));
                }
            }

            let mut orphans = Vec::new();
            for id in visible {
                if let Some(face) = mesh.remove(id) {
                    orphans.extend(face.outside.into_iter().filter(|&i| i != eye));
                }
            }

            let fan: Vec<usize> = horizon
                .into_iter()
                .map(|(u, v)| mesh.insert(Face::new(points, [u, v, eye])))
                .collect();
            mesh.assign(points, &fan, orphans);
        }

        let faces: Vec<Face> = mesh.faces.into_iter().flatten().collect();
        let mut used: Vec<usize> = faces.iter().flat_map(|f| f.vertices).collect();
        used.sort_unstable();
        used.dedup();
        let vertices = used
            .into_iter()
            .map(|i| Point3D::new(points[i].x, points[i].y, points[i].z))
            .collect();

        Some(Self { vertices, faces })
    }

    /// Corner points of the hull.
    pub fn vertices(&self) -> &[Point3D] {
        &self.vertices
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when `point` lies inside or on the hull.
    pub fn contains(&self, point: &Point3D) -> bool {
        let p = Vector3::new(point.x, point.y, point.z);
        self.faces
            .iter()
            .all(|f| f.signed_distance(&p) <= PLANE_EPSILON * 10.0)
    }

    /// True when any vertex of either hull lies inside the other.
    pub fn overlaps(&self, other: &ConvexHull) -> bool {
        other.vertices.iter().any(|v| self.contains(v))
            || self.vertices.iter().any(|v| other.contains(v))
    }
}

/// Winding of `tri` with its normal pointing away from `interior`.
fn outward(points: &[Vector3<f32>], tri: [usize; 3], interior: &Vector3<f32>) -> [usize; 3] {
    let [a, b, c] = tri;
    let normal = (points[b] - points[a]).cross(&(points[c] - points[a]));
    if normal.dot(&(interior - points[a])) > 0.0 {
        [a, c, b]
    } else {
        tri
    }
}

/// Four points spanning a tetrahedron of non-trivial volume.
fn initial_simplex(points: &[Vector3<f32>]) -> Option<[usize; 4]> {
    if points.len() < 4 {
        return None;
    }
    let a = (0..points.len()).min_by(|&i, &j| points[i].x.total_cmp(&points[j].x))?;
    let b = farthest(points, |p| (p - points[a]).norm())?;

    let ab = points[b] - points[a];
    if ab.norm() < PLANE_EPSILON {
        return None;
    }
    let c = farthest(points, |p| ab.cross(&(p - points[a])).norm())?;

    let normal = ab.cross(&(points[c] - points[a]));
    if normal.norm() < PLANE_EPSILON {
        return None;
    }
    let normal = normal.normalize();
    let d = farthest(points, |p| normal.dot(&(p - points[a])).abs())?;
    if normal.dot(&(points[d] - points[a])).abs() < 1e-4 {
        return None;
    }
    Some([a, b, c, d])
}

fn farthest(points: &[Vector3<f32>], metric: impl Fn(&Vector3<f32>) -> f32) -> Option<usize> {
    (0..points.len()).max_by(|&i, &j| metric(&points[i]).total_cmp(&metric(&points[j])))
}
