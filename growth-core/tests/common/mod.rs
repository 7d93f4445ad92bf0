#![allow(dead_code)]

use growth_core::{cell::calc_region, config::Config, mesh::Mesh, types::CellId};
use std::collections::BTreeMap;

/// Regular icosahedron with outward counter-clockwise faces.
pub fn icosahedron_faces() -> (Vec<[f64; 3]>, Vec<[usize; 3]>) {
    let t = (1.0 + 5f64.sqrt()) / 2.0;
    let vertices = vec![
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ];
    let faces = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    (vertices, faces)
}

/// Counter-clockwise neighbor lists from a closed, consistently oriented
/// triangle list. Each list starts at the cell's lowest-numbered neighbor.
pub fn adjacency_from_faces(n: usize, faces: &[[usize; 3]]) -> Vec<Vec<usize>> {
    let mut next: Vec<BTreeMap<usize, usize>> = vec![BTreeMap::new(); n];
    for &[a, b, c] in faces {
        next[a].insert(b, c);
        next[b].insert(c, a);
        next[c].insert(a, b);
    }

    next.iter()
        .map(|ring| {
            let Some((&start, _)) = ring.iter().next() else {
                return Vec::new();
            };
            let mut list = vec![start];
            let mut at = ring[&start];
            while at != start {
                list.push(at);
                at = ring[&at];
            }
            list
        })
        .collect()
}

pub fn icosahedron(cfg: Config) -> Mesh {
    let (vertices, faces) = icosahedron_faces();
    let adjacency = adjacency_from_faces(vertices.len(), &faces);
    Mesh::new(&vertices, &adjacency, cfg).expect("icosahedron is well formed")
}

/// Every edge is listed from both ends.
pub fn assert_symmetric(mesh: &Mesh) {
    for c in mesh.cells() {
        for &u in c.neighbors() {
            assert!(
                mesh.cell(u).neighbors().contains(&c.index()),
                "{} lists {u}, but not the other way round",
                c.index()
            );
        }
    }
}

/// Consecutive neighbors `u, w` of a cell `c` bound the triangle
/// `(c, u, w)`, which `u` must see in the same orientation.
pub fn assert_consistent_faces(mesh: &Mesh) {
    for c in mesh.cells() {
        let n = c.valence();
        for k in 0..n {
            let (u, w) = (c.neighbors()[k], c.neighbors()[(k + 1) % n]);
            assert_eq!(
                mesh.cell(u).next(w),
                Some(c.index()),
                "triangle ({}, {u}, {w}) is not seen the same way from {u}",
                c.index()
            );
        }
    }
}

/// Cached regions match a fresh breadth-first search.
pub fn assert_regions_fresh(mesh: &Mesh) {
    for c in mesh.cells() {
        let fresh = calc_region(mesh.cells(), c.index(), mesh.region_radius());
        assert_eq!(c.region(), &fresh, "stale region for cell {}", c.index());
    }
}

pub fn valences(mesh: &Mesh, ids: &[CellId]) -> Vec<usize> {
    ids.iter().map(|&id| mesh.cell(id).valence()).collect()
}
