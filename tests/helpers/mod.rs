///! Sealed-room tree builders shared by the pipeline scenarios.
///!
///! These play the role of the upstream CSG and portal-flood stages: they
///! hand the pipeline a finished tree with portals already linked.

use wqbsp::bsp::{Entity, NodeId, SideRef, Tree};
use wqbsp::game::Contents;
use wqbsp::geom::{BoundBox, Plane, Winding};
use wqbsp::math::Vec3d;
use wqbsp::{make_face_edges, make_faces, make_mark_faces, vec3d, CompileContext, MakeFacesStats};

/// Every wall of an axial box, outermost splitter first
pub const ALL_WALLS: [(usize, bool); 6] = [
    (0, true),
    (0, false),
    (1, true),
    (1, false),
    (2, true),
    (2, false),
];

/// Axial quad on `axis = dist` covering the box cross-section, wound so its
/// normal points along +axis
pub fn axis_quad(axis: usize, dist: f64, mins: [f64; 3], maxs: [f64; 3]) -> Winding {
    let u = (axis + 1) % 3;
    let v = (axis + 2) % 3;

    let corners = [
        (mins[u], mins[v]),
        (maxs[u], mins[v]),
        (maxs[u], maxs[v]),
        (mins[u], maxs[v]),
    ];

    Winding::new(
        corners
            .iter()
            .map(|&(a, b)| {
                let mut point = Vec3d::zero();
                point[axis] = dist;
                point[u] = a;
                point[v] = b;
                point
            })
            .collect(),
    )
}

/// Build a sealed room: one interior leaf wrapped by a chain of wall
/// splitters, each with a solid outer leaf and a portal bridging the
/// interior to it. Returns the subtree root and the interior leaf.
pub fn build_room_subtree(
    ctx: &mut CompileContext,
    tree: &mut Tree,
    mins: [f64; 3],
    maxs: [f64; 3],
    walls: &[(usize, bool)],
    contents: Contents,
    texinfo: usize,
) -> (NodeId, NodeId) {
    let bounds = BoundBox::for_points(&[
        vec3d!(mins[0], mins[1], mins[2]),
        vec3d!(maxs[0], maxs[1], maxs[2]),
    ]);

    let interior = tree.add_leaf(contents, bounds);

    let mut inner = interior;
    for &(axis, is_max) in walls.iter().rev() {
        let dist = if is_max { maxs[axis] } else { mins[axis] };

        let mut normal = Vec3d::zero();
        normal[axis] = 1.0;
        let planenum = ctx.planes.add_or_find(Plane::new(normal, dist));

        let solid = tree.add_leaf(Contents::SOLID, BoundBox::zero());
        let node = if is_max {
            tree.add_node(planenum, [solid, inner], bounds)
        } else {
            tree.add_node(planenum, [inner, solid], bounds)
        };

        let winding = axis_quad(axis, dist, mins, maxs);
        let side = SideRef {
            planenum,
            planeside: is_max as usize,
            texinfo,
            lmshift: 4,
        };

        // the portal winding faces the front node
        if is_max {
            tree.add_portal(winding, solid, interior, Some(node), Some(side));
        } else {
            tree.add_portal(winding, interior, solid, Some(node), Some(side));
        }

        inner = node;
    }

    (inner, interior)
}

pub fn build_box_room(
    ctx: &mut CompileContext,
    tree: &mut Tree,
    mins: [f64; 3],
    maxs: [f64; 3],
    contents: Contents,
    texinfo: usize,
) -> (NodeId, NodeId) {
    build_room_subtree(ctx, tree, mins, maxs, &ALL_WALLS, contents, texinfo)
}

/// Run the whole pipeline over one entity tree
pub fn run_pipeline(ctx: &mut CompileContext, tree: &mut Tree, root: NodeId) -> (MakeFacesStats, u32) {
    let stats = make_faces(ctx, tree, root);
    make_mark_faces(ctx, tree, root);

    let mut entity = Entity::new();
    let firstface = make_face_edges(ctx, tree, &mut entity, root);

    (stats, firstface)
}

// mod.rs
