///! Mark-surface assignment and emission into the output tables.

use itertools::chain;
use log::debug;

use crate::{
    game::Contents,
    geom::{self, Winding},
    math::Vec3d,
    CompileContext,
};

use super::{
    lumps::{self, MAXEDGES, MAXLIGHTMAPS},
    Entity, Face, FaceFragment, FaceId, NodeId, NodeKind, Tree,
};

/// Default lightmap scale shift; anything else turns the side-band lump on
const DEFAULT_LMSHIFT: u8 = 4;

// mark surfaces =============================================================

/// Populate the `markfaces` lists of all leafs below `node_id`: every face
/// of every splitter is clipped down the tree, and each leaf it overlaps
/// records the original face.
pub fn make_mark_faces(ctx: &CompileContext, tree: &mut Tree, node_id: NodeId) {
    let (children, face_ids) = match &tree.node(node_id).kind {
        NodeKind::Internal { children, faces, .. } => (*children, faces.clone()),
        NodeKind::Leaf { .. } => return,
    };

    for face_id in face_ids {
        // clip a throwaway copy, only the original face lands in leaf lists
        let face = tree.face(face_id);
        let down_side = face.planeside;
        let winding = face.primary.winding.clone();

        add_mark_faces_r(ctx, tree, face_id, winding, children[down_side]);
    }

    make_mark_faces(ctx, tree, children[0]);
    make_mark_faces(ctx, tree, children[1]);
}

fn add_mark_faces_r(ctx: &CompileContext, tree: &mut Tree, face_id: FaceId, winding: Winding, node_id: NodeId) {
    let (planenum, children) = match &mut tree.node_mut(node_id).kind {
        NodeKind::Leaf { markfaces, .. } => {
            markfaces.push(face_id);
            return;
        }
        NodeKind::Internal { planenum, children, .. } => (*planenum, *children),
    };

    let split_plane = ctx.planes.get(planenum);

    match split_plane.split_winding(&winding) {
        geom::WindingSplitResult::Split { front, back } => {
            add_mark_faces_r(ctx, tree, face_id, front, children[0]);
            add_mark_faces_r(ctx, tree, face_id, back, children[1]);
        }
        geom::WindingSplitResult::Front => {
            add_mark_faces_r(ctx, tree, face_id, winding, children[0]);
        }
        geom::WindingSplitResult::Back => {
            add_mark_faces_r(ctx, tree, face_id, winding, children[1]);
        }
        geom::WindingSplitResult::OnPlane => {
            // coplanar residue follows the front side
            add_mark_faces_r(ctx, tree, face_id, winding, children[0]);
        }
    }
}

// emission ==================================================================

fn should_omit_face(ctx: &CompileContext, face: &Face) -> bool {
    let flags = ctx.texinfos[face.texinfo].flags;

    if !ctx.options.includeskip && flags.is_skip {
        return true;
    }
    if flags.is_hint {
        return true;
    }

    // the interior faces of sky volumes never reach the output
    if ctx.game().is_sky(face.contents) {
        return true;
    }

    false
}

fn count_face(ctx: &mut CompileContext, tree: &Tree, face_id: FaceId, faces: &mut usize, vertexes: &mut usize) {
    let face = tree.face(face_id);

    if should_omit_face(ctx, face) {
        return;
    }

    if face.lmshift != DEFAULT_LMSHIFT {
        ctx.output.needslmshifts = true;
    }

    *faces += 1;
    *vertexes += face.primary.winding.points.len();
}

fn count_data_r(ctx: &mut CompileContext, tree: &Tree, node_id: NodeId, faces: &mut usize, vertexes: &mut usize) {
    let (children, face_ids) = match &tree.node(node_id).kind {
        NodeKind::Internal { children, faces, .. } => (*children, faces.clone()),
        NodeKind::Leaf { .. } => return,
    };

    for face_id in face_ids {
        count_face(ctx, tree, face_id, faces, vertexes);
    }

    count_data_r(ctx, tree, children[0], faces, vertexes);
    count_data_r(ctx, tree, children[1], faces, vertexes);
}

/// Get a signed surfedge index for the directed pair `(p1, p2)`
fn get_edge(ctx: &mut CompileContext, p1: Vec3d, p2: Vec3d, face_id: FaceId, contents: Contents) -> i32 {
    let game = ctx.game();

    let v1 = ctx.vertexes.get_or_add(p1) as u32;
    let v2 = ctx.vertexes.get_or_add(p2) as u32;

    ctx.edges.get_or_add_directed(v1, v2, face_id, contents, game)
}

fn find_fragment_edges(ctx: &mut CompileContext, fragment: &mut FaceFragment, face_id: FaceId, contents: Contents) {
    fragment.output_number = None;

    let count = fragment.winding.points.len();
    if count > MAXEDGES {
        panic!("internal error: face fragment with {count} points exceeds {MAXEDGES}");
    }

    let mut edges = Vec::with_capacity(count);
    for index in 0..count {
        let p1 = fragment.winding.points[index];
        let p2 = fragment.winding.points[(index + 1) % count];

        edges.push(get_edge(ctx, p1, p2, face_id, contents));
    }

    fragment.edges = edges;
}

/// Replace the vertex loops of the face and its fragments with signed
/// surfedge index sequences.
fn find_face_edges(ctx: &mut CompileContext, tree: &mut Tree, face_id: FaceId) {
    if should_omit_face(ctx, tree.face(face_id)) {
        return;
    }

    let face = tree.face_mut(face_id);
    let contents = face.contents;

    for fragment in chain!(std::iter::once(&mut face.primary), face.fragments.iter_mut()) {
        find_fragment_edges(ctx, fragment, face_id, contents);
    }
}

fn make_face_edges_r(ctx: &mut CompileContext, tree: &mut Tree, node_id: NodeId) {
    let (children, face_ids) = match &tree.node(node_id).kind {
        NodeKind::Internal { children, faces, .. } => (*children, faces.clone()),
        NodeKind::Leaf { .. } => return,
    };

    for face_id in face_ids {
        find_face_edges(ctx, tree, face_id);
    }

    make_face_edges_r(ctx, tree, children[0]);
    make_face_edges_r(ctx, tree, children[1]);
}

fn export_map_plane(ctx: &mut CompileContext, planenum: usize) -> u32 {
    if let Some(output_num) = ctx.planes.entry(planenum).output_num {
        return output_num;
    }

    let plane = ctx.planes.get(planenum);
    let output_num = ctx.output.planes.len() as u32;

    ctx.output.planes.push(lumps::DPlane {
        normal: [plane.normal.x as f32, plane.normal.y as f32, plane.normal.z as f32],
        dist: plane.distance as f32,
        ty: plane.plane_type() as i32,
    });
    ctx.planes.entry_mut(planenum).output_num = Some(output_num);

    output_num
}

fn export_map_texinfo(ctx: &mut CompileContext, texinfo: usize) -> u32 {
    if let Some(output_num) = ctx.texinfos[texinfo].output_num {
        return output_num;
    }

    let output_num = ctx.output.texinfos.len() as u32;
    let tex = &ctx.texinfos[texinfo];

    ctx.output.texinfos.push(lumps::DTexinfo {
        vecs: [
            [
                tex.vecs[0][0] as f32,
                tex.vecs[0][1] as f32,
                tex.vecs[0][2] as f32,
                tex.vecs[0][3] as f32,
            ],
            [
                tex.vecs[1][0] as f32,
                tex.vecs[1][1] as f32,
                tex.vecs[1][2] as f32,
                tex.vecs[1][3] as f32,
            ],
        ],
        miptex: tex.miptex,
        flags: tex.flags.bits(),
    });
    ctx.texinfos[texinfo].output_num = Some(output_num);

    output_num
}

fn emit_face_fragment(
    ctx: &mut CompileContext,
    fragment: &mut FaceFragment,
    planenum: usize,
    planeside: usize,
    texinfo: usize,
    lmshift: u8,
) {
    assert!(fragment.output_number.is_none(), "face fragment emitted twice");
    fragment.output_number = Some(ctx.output.faces.len() as u32);

    ctx.output.lmshifts.push(lmshift);

    let out_planenum = export_map_plane(ctx, planenum);
    let out_texinfo = export_map_texinfo(ctx, texinfo);

    let firstedge = ctx.output.surfedges.len() as i32;
    ctx.output.surfedges.extend(fragment.edges.drain(..));
    let numedges = ctx.output.surfedges.len() as i32 - firstedge;

    ctx.output.faces.push(lumps::DFace {
        planenum: out_planenum as i32,
        side: planeside as i32,
        firstedge,
        numedges,
        texinfo: out_texinfo as i32,
        styles: [255; MAXLIGHTMAPS],
        lightofs: -1,
    });

    assert_eq!(ctx.output.faces.len(), ctx.output.lmshifts.len());
}

fn emit_face(ctx: &mut CompileContext, tree: &mut Tree, face_id: FaceId) {
    if should_omit_face(ctx, tree.face(face_id)) {
        return;
    }

    let face = tree.face_mut(face_id);
    let (planenum, planeside, texinfo, lmshift) = (face.planenum, face.planeside, face.texinfo, face.lmshift);

    for fragment in chain!(std::iter::once(&mut face.primary), face.fragments.iter_mut()) {
        emit_face_fragment(ctx, fragment, planenum, planeside, texinfo, lmshift);
    }
}

/// Stamp `firstface`/`numfaces` into every splitter and append its face
/// records. The walk order defines the on-disk face ordering.
fn grow_node_region(ctx: &mut CompileContext, tree: &mut Tree, node_id: NodeId) {
    let (children, face_ids) = match &tree.node(node_id).kind {
        NodeKind::Internal { children, faces, .. } => (*children, faces.clone()),
        NodeKind::Leaf { .. } => return,
    };

    let first = ctx.output.faces.len() as u32;

    for face_id in face_ids {
        emit_face(ctx, tree, face_id);
    }

    let count = ctx.output.faces.len() as u32 - first;

    let NodeKind::Internal { firstface, numfaces, .. } = &mut tree.node_mut(node_id).kind else {
        unreachable!();
    };
    *firstface = first;
    *numfaces = count;

    grow_node_region(ctx, tree, children[0]);
    grow_node_region(ctx, tree, children[1]);
}

/// Emit the entity's faces, vertices and edges into the output tables,
/// returning the first face lump index assigned to the entity.
pub fn make_face_edges(ctx: &mut CompileContext, tree: &mut Tree, entity: &mut Entity, root: NodeId) -> u32 {
    debug!("---- make_face_edges ----");

    assert!(entity.first_output_face.is_none(), "entity faces emitted twice");
    entity.first_output_face = Some(ctx.output.faces.len() as u32);

    let mut faces_count = 0;
    let mut vertexes_count = 0;
    count_data_r(ctx, tree, root, &mut faces_count, &mut vertexes_count);

    ctx.output.faces.reserve(faces_count);
    ctx.output.lmshifts.reserve(faces_count);
    ctx.vertexes.reserve(vertexes_count);

    ctx.edges.reset_scratch();

    let firstface = ctx.output.faces.len() as u32;

    make_face_edges_r(ctx, tree, root);

    ctx.edges.reset_scratch();

    debug!("---- grow_node_region ----");
    grow_node_region(ctx, tree, root);

    firstface
}


// emit.rs
