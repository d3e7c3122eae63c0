///! Face materialisation from portals, per-node merging and subdivision.

use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::{
    geom::{self, Winding},
    math::Vec3d,
    vec3d, CompileContext,
};

use super::{Face, FaceFragment, FaceId, NodeId, NodeKind, PortalId, Tree};

/// Face generation statistics of one tree walk
#[derive(Copy, Clone, Default, Debug)]
pub struct MakeFacesStats {
    /// Faces grown from portals
    pub c_nodefaces: u32,

    /// Face pairs fused by the merger
    pub c_merge: u32,

    /// Chops performed by the subdivider
    pub c_subdivide: u32,
}

/// Populate node facelists from the portals of every non-solid leaf, then
/// merge and subdivide each node's faces bottom-up.
pub fn make_faces(ctx: &CompileContext, tree: &mut Tree, root: NodeId) -> MakeFacesStats {
    debug!("--- make_faces ---");

    let mut stats = MakeFacesStats::default();

    make_faces_r(ctx, tree, root, &mut stats);

    debug!("{} makefaces", stats.c_nodefaces);
    debug!("{} merged", stats.c_merge);
    debug!("{} subdivided", stats.c_subdivide);

    stats
}

fn make_faces_r(ctx: &CompileContext, tree: &mut Tree, node_id: NodeId, stats: &mut MakeFacesStats) {
    let children = match &tree.node(node_id).kind {
        NodeKind::Internal { children, .. } => Some(*children),
        NodeKind::Leaf { .. } => None,
    };

    // recurse down to leafs, a node's faces are complete only once both
    // subtrees are materialised
    if let Some(children) = children {
        make_faces_r(ctx, tree, children[0], stats);
        make_faces_r(ctx, tree, children[1], stats);

        if !ctx.options.nomerge {
            merge_node_faces(ctx, tree, node_id, stats);
        }
        if ctx.options.subdivide != 0 {
            subdivide_node_faces(ctx, tree, node_id, stats);
        }

        return;
    }

    let (contents, mut next_portal) = match &tree.node(node_id).kind {
        NodeKind::Leaf { contents, portals, .. } => (*contents, *portals),
        NodeKind::Internal { .. } => unreachable!(),
    };

    // solid leafs never have visible faces
    if ctx.game().is_any_solid(contents) {
        return;
    }

    // walking per leaf, so a portal can grow one face from each of its sides
    while let Some(portal_id) = next_portal {
        let portal = tree.portal(portal_id);
        let pside = (portal.nodes[1] == node_id) as usize;

        next_portal = portal.next[pside];

        let Some(face) = face_from_portal(ctx, tree, portal_id, pside) else {
            continue;
        };

        stats.c_nodefaces += 1;

        let onnode = tree.portal(portal_id).onnode.unwrap();
        let face_id = tree.add_face(face);

        tree.portal_mut(portal_id).face[pside] = Some(face_id);

        let NodeKind::Internal { faces, .. } = &mut tree.node_mut(onnode).kind else {
            panic!("portal onnode {onnode:?} is not a splitter");
        };
        faces.push(face_id);
    }
}

/// Grow a face for side `pside` of the portal, if that side represents a
/// visible contents boundary.
fn face_from_portal(ctx: &CompileContext, tree: &Tree, portal_id: PortalId, pside: usize) -> Option<Face> {
    let portal = tree.portal(portal_id);
    let game = ctx.game();

    // portal does not bridge different visible contents
    let side = portal.side?;

    let near = tree.leaf_contents(portal.nodes[pside]);
    let far = tree.leaf_contents(portal.nodes[pside ^ 1]);

    if !game.directional_visible_contents(near, far) {
        trace!("skipped face for {} -> {} portal", near.native, far.native);
        return None;
    }

    // a volumetric interior grows faces on both sides only when the contents
    // are self-mirroring, otherwise only where the brush side looks
    if !game.is_empty(near) && !game.contents_are_mirrored(near) && side.planeside != pside {
        return None;
    }

    let winding = if pside == 1 {
        portal.winding.flipped()
    } else {
        portal.winding.clone()
    };

    Some(Face {
        primary: FaceFragment::new(winding),
        fragments: Vec::new(),
        planenum: side.planenum,
        planeside: pside,
        texinfo: side.texinfo,
        contents: near,
        lmshift: side.lmshift,
        portal: Some(portal_id),
    })
}

/// Fuse coplanar same-texture faces of the node while the union stays
/// convex. Runs to a fixed point in input order.
fn merge_node_faces(ctx: &CompileContext, tree: &mut Tree, node_id: NodeId, stats: &mut MakeFacesStats) {
    let NodeKind::Internal { faces, .. } = &mut tree.node_mut(node_id).kind else {
        return;
    };
    let mut list = std::mem::take(faces);

    loop {
        let mut fused = false;

        let mut index = 0;
        while index < list.len() {
            let mut other = index + 1;

            while other < list.len() {
                let Some(winding) = try_merge(ctx, tree, list[index], list[other]) else {
                    other += 1;
                    continue;
                };

                tree.face_mut(list[index]).primary.winding = winding;
                list.remove(other);

                stats.c_merge += 1;
                fused = true;
            }

            index += 1;
        }

        if !fused {
            break;
        }
    }

    let NodeKind::Internal { faces, .. } = &mut tree.node_mut(node_id).kind else {
        unreachable!();
    };
    *faces = list;
}

fn try_merge(ctx: &CompileContext, tree: &Tree, first: FaceId, second: FaceId) -> Option<Winding> {
    let f1 = tree.face(first);
    let f2 = tree.face(second);

    if f1.planenum != f2.planenum
        || f1.planeside != f2.planeside
        || f1.texinfo != f2.texinfo
        || f1.contents != f2.contents
        || f1.lmshift != f2.lmshift
    {
        return None;
    }

    let plane = ctx.planes.get(f1.planenum);
    let plane_normal = if f1.planeside == 1 {
        -plane.normal
    } else {
        plane.normal
    };

    try_merge_windings(&f1.primary.winding, &f2.primary.winding, plane_normal)
}

/// Fuse two windings that share an edge traversed in opposite directions,
/// provided both join corners stay convex. Colinear join points are dropped
/// from the union.
fn try_merge_windings(f1: &Winding, f2: &Winding, plane_normal: Vec3d) -> Option<Winding> {
    let count1 = f1.points.len();
    let count2 = f2.points.len();

    // find a common edge
    let mut shared = None;

    'edge_search: for i in 0..count1 {
        let p1 = f1.points[i];
        let p2 = f1.points[(i + 1) % count1];

        for j in 0..count2 {
            let p3 = f2.points[j];
            let p4 = f2.points[(j + 1) % count2];

            if geom::points_equal(p1, p4, geom::EQUAL_EPSILON) && geom::points_equal(p2, p3, geom::EQUAL_EPSILON) {
                shared = Some((i, j));
                break 'edge_search;
            }
        }
    }

    let (i, j) = shared?;
    let p1 = f1.points[i];
    let p2 = f1.points[(i + 1) % count1];

    // both join corners must remain convex
    let back = f1.points[(i + count1 - 1) % count1];
    let normal = (plane_normal % (p1 - back)).normalized();

    let back = f2.points[(j + 2) % count2];
    let dot = (back - p1) ^ normal;
    if dot > geom::CONTINUOUS_EPSILON {
        return None;
    }
    let keep1 = dot < -geom::CONTINUOUS_EPSILON;

    let back = f1.points[(i + 2) % count1];
    let normal = (plane_normal % (back - p2)).normalized();

    let back = f2.points[(j + count2 - 1) % count2];
    let dot = (back - p2) ^ normal;
    if dot > geom::CONTINUOUS_EPSILON {
        return None;
    }
    let keep2 = dot < -geom::CONTINUOUS_EPSILON;

    // build the fused winding, skipping the shared edge and colinear joins
    let mut points = Vec::with_capacity(count1 + count2);

    let mut k = (i + 1) % count1;
    while k != i {
        if !(k == (i + 1) % count1 && !keep2) {
            points.push(f1.points[k]);
        }
        k = (k + 1) % count1;
    }

    let mut l = (j + 1) % count2;
    while l != j {
        if !(l == (j + 1) % count2 && !keep1) {
            points.push(f2.points[l]);
        }
        l = (l + 1) % count2;
    }

    Some(Winding::new(points))
}

fn subdivide_node_faces(ctx: &CompileContext, tree: &mut Tree, node_id: NodeId, stats: &mut MakeFacesStats) {
    let NodeKind::Internal { faces, .. } = &mut tree.node_mut(node_id).kind else {
        return;
    };
    let list = std::mem::take(faces);

    let mut result = Vec::with_capacity(list.len());
    for face_id in list {
        subdivide_face(ctx, tree, face_id, &mut result, stats);
    }

    let NodeKind::Internal { faces, .. } = &mut tree.node_mut(node_id).kind else {
        unreachable!();
    };
    *faces = result;
}

/// Chop the face until no piece exceeds the subdivision limit along either
/// texture axis. The first axis completes before the second begins.
fn subdivide_face(
    ctx: &CompileContext,
    tree: &mut Tree,
    face_id: FaceId,
    out: &mut Vec<FaceId>,
    stats: &mut MakeFacesStats,
) {
    let tex = &ctx.texinfos[tree.face(face_id).texinfo];

    // special (non surface-cached) faces don't need subdivision
    if tex.flags.is_skip || tex.flags.is_hint || !ctx.game().surf_is_subdivided(tex.flags) {
        out.push(face_id);
        return;
    }

    // legacy lighting can't scale past 1:16
    let lmshift = tree.face(face_id).lmshift.min(4);
    let subdiv = u32::min(ctx.options.subdivide, 255 << lmshift) as f64;

    let mut surfaces = VecDeque::from([std::mem::take(&mut tree.face_mut(face_id).primary.winding)]);

    for axis in 0..2 {
        let axis_vec = vec3d!(tex.vecs[axis][0], tex.vecs[axis][1], tex.vecs[axis][2]);

        // pieces chopped down to size on this axis
        let mut chopped = VecDeque::new();

        while let Some(winding) = surfaces.pop_front() {
            let (mins, maxs) = winding
                .points
                .iter()
                .fold((f64::MAX, -f64::MAX), |(mins, maxs), point| {
                    let v = *point ^ axis_vec;
                    (f64::min(mins, v), f64::max(maxs, v))
                });

            let extent = maxs.ceil() - mins.floor();
            if extent <= subdiv {
                // this piece is already good
                chopped.push_back(winding);
                continue;
            }

            // the 16 unit slack covers clipping noise and lightmap scaling
            // in both legacy and modern runtimes
            let scale = axis_vec.length();
            let plane = geom::Plane::new(axis_vec / scale, (mins + subdiv - 16.0) / scale);

            match plane.split_winding(&winding) {
                geom::WindingSplitResult::Split { front, back } => {
                    stats.c_subdivide += 1;

                    surfaces.push_back(front);
                    chopped.push_front(back);
                }
                _ => {
                    warn!("subdivision failed to split an oversized face, keeping it whole");
                    chopped.push_back(winding);
                }
            }
        }

        surfaces = chopped;
    }

    // the first piece keeps the original face slot, the rest become fresh
    // faces with the same surface data
    let mut pieces = surfaces.into_iter();

    tree.face_mut(face_id).primary.winding = pieces.next().unwrap();
    out.push(face_id);

    let (planenum, planeside, texinfo, contents, lmshift, portal) = {
        let face = tree.face(face_id);
        (face.planenum, face.planeside, face.texinfo, face.contents, face.lmshift, face.portal)
    };

    for winding in pieces {
        let id = tree.add_face(Face {
            primary: FaceFragment::new(winding),
            fragments: Vec::new(),
            planenum,
            planeside,
            texinfo,
            contents,
            lmshift,
            portal,
        });

        out.push(id);
    }
}


// faces.rs
