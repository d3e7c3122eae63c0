///! End-to-end scenarios over sealed box rooms.

mod helpers;

use helpers::{build_box_room, build_room_subtree, run_pipeline, ALL_WALLS};
use wqbsp::bsp::{FaceId, NodeId, NodeKind, Tree};
use wqbsp::game::{Contents, SurfFlags, Texinfo};
use wqbsp::{vec3d, CompileContext, Options};

const XY_TEXINFO: [[f64; 4]; 2] = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];

fn plain_texinfo(ctx: &mut CompileContext) -> usize {
    ctx.add_texinfo(Texinfo::new(XY_TEXINFO, 0, SurfFlags::default()))
}

/// Every face id reachable from splitter facelists, in emission walk order
fn collect_faces(tree: &Tree, node: NodeId, out: &mut Vec<FaceId>) {
    let NodeKind::Internal { children, faces, .. } = &tree.node(node).kind else {
        return;
    };

    out.extend(faces.iter().copied());

    collect_faces(tree, children[0], out);
    collect_faces(tree, children[1], out);
}

fn leaf_markfaces(tree: &Tree, leaf: NodeId) -> Vec<FaceId> {
    let NodeKind::Leaf { markfaces, .. } = &tree.node(leaf).kind else {
        panic!("splitter has no markfaces");
    };

    markfaces.clone()
}

#[test]
fn unit_cube_room() {
    let mut ctx = CompileContext::default();
    let texinfo = plain_texinfo(&mut ctx);
    let mut tree = Tree::new();

    let (root, interior) = build_box_room(
        &mut ctx,
        &mut tree,
        [0.0, 0.0, 0.0],
        [64.0, 64.0, 64.0],
        Contents::EMPTY,
        texinfo,
    );

    let (stats, firstface) = run_pipeline(&mut ctx, &mut tree, root);

    // one face per portal side that passes the visibility predicate
    assert_eq!(stats.c_nodefaces, 6);
    assert_eq!(firstface, 0);
    assert_eq!(ctx.output.faces.len(), 6);

    // eight shared corners, twelve edges each used once per direction
    assert_eq!(ctx.vertexes.len(), 8);
    assert_eq!(ctx.edges.len() - 1, 12);
    assert_eq!(ctx.output.surfedges.len(), 24);
    assert_eq!(ctx.output.surfedges.iter().filter(|e| **e < 0).count(), 12);

    for face in &ctx.output.faces {
        assert_eq!({ face.numedges }, 4);
    }

    // every wall face touches the interior region
    let mut all_faces = Vec::new();
    collect_faces(&tree, root, &mut all_faces);
    assert_eq!(all_faces.len(), 6);

    let mut marked = leaf_markfaces(&tree, interior);
    let mut expected = all_faces.clone();
    marked.sort();
    expected.sort();
    assert_eq!(marked, expected);

    // each splitter owns exactly one emitted face
    let mut total = 0;
    for node in &tree.nodes {
        if let NodeKind::Internal { numfaces, .. } = &node.kind {
            assert_eq!(*numfaces, 1);
            total += numfaces;
        }
    }
    assert_eq!(total, 6);
}

#[test]
fn abutting_cubes_share_an_edge_ring() {
    let mut ctx = CompileContext::default();
    let texinfo = plain_texinfo(&mut ctx);
    let mut tree = Tree::new();

    // two rooms joined through an open x=64 contact
    let a_walls: Vec<(usize, bool)> = ALL_WALLS.iter().copied().filter(|w| *w != (0, true)).collect();
    let b_walls: Vec<(usize, bool)> = ALL_WALLS.iter().copied().filter(|w| *w != (0, false)).collect();

    let (a_root, a_interior) = build_room_subtree(
        &mut ctx,
        &mut tree,
        [0.0, 0.0, 0.0],
        [64.0, 64.0, 64.0],
        &a_walls,
        Contents::EMPTY,
        texinfo,
    );
    let (b_root, b_interior) = build_room_subtree(
        &mut ctx,
        &mut tree,
        [64.0, 0.0, 0.0],
        [128.0, 64.0, 64.0],
        &b_walls,
        Contents::EMPTY,
        texinfo,
    );

    let planenum = ctx
        .planes
        .add_or_find(wqbsp::geom::Plane::new(vec3d!(1.0, 0.0, 0.0), 64.0));
    let root = tree.add_node(planenum, [b_root, a_root], wqbsp::geom::BoundBox::zero());

    // the shared contact carries no brush side, it grows no face
    tree.add_portal(
        helpers::axis_quad(0, 64.0, [64.0, 0.0, 0.0], [128.0, 64.0, 64.0]),
        b_interior,
        a_interior,
        Some(root),
        None,
    );

    let (stats, _) = run_pipeline(&mut ctx, &mut tree, root);

    assert_eq!(stats.c_nodefaces, 10);
    assert_eq!(ctx.output.faces.len(), 10);

    // the x=64 corner ring collapses: 8 + 8 - 4 vertices, 12 + 12 - 4 edges
    assert_eq!(ctx.vertexes.len(), 12);
    assert_eq!(ctx.edges.len() - 1, 20);
    assert_eq!(ctx.output.surfedges.len(), 40);
    assert_eq!(ctx.output.surfedges.iter().filter(|e| **e < 0).count(), 20);
}

#[test]
fn big_room_subdivision_bound() {
    let mut ctx = CompileContext::default();
    let texinfo = plain_texinfo(&mut ctx);
    let mut tree = Tree::new();

    let (root, _) = build_box_room(
        &mut ctx,
        &mut tree,
        [0.0, 0.0, 0.0],
        [512.0, 512.0, 512.0],
        Contents::EMPTY,
        texinfo,
    );

    run_pipeline(&mut ctx, &mut tree, root);

    // x/y texture axes chop: floor and ceiling 3x3, side walls 3x1
    let mut all_faces = Vec::new();
    collect_faces(&tree, root, &mut all_faces);
    assert_eq!(all_faces.len(), 4 * 3 + 2 * 9);
    assert_eq!(ctx.output.faces.len(), 30);

    for face_id in all_faces {
        let winding = &tree.face(face_id).primary.winding;

        for axis_vec in [vec3d!(1.0, 0.0, 0.0), vec3d!(0.0, 1.0, 0.0)] {
            let (mins, maxs) = winding
                .points
                .iter()
                .fold((f64::MAX, -f64::MAX), |(mins, maxs), point| {
                    let v = *point ^ axis_vec;
                    (f64::min(mins, v), f64::max(maxs, v))
                });

            assert!(maxs.ceil() - mins.floor() <= 240.0);
        }
    }
}

#[test]
fn skip_faces_stay_out_of_the_output() {
    let mut ctx = CompileContext::default();
    let texinfo = ctx.add_texinfo(Texinfo::new(
        XY_TEXINFO,
        0,
        SurfFlags {
            is_skip: true,
            ..SurfFlags::default()
        },
    ));
    let mut tree = Tree::new();

    let (root, interior) = build_box_room(
        &mut ctx,
        &mut tree,
        [0.0, 0.0, 0.0],
        [64.0, 64.0, 64.0],
        Contents::EMPTY,
        texinfo,
    );

    let (stats, _) = run_pipeline(&mut ctx, &mut tree, root);

    // the faces exist in the tree and in leaf markfaces, the table omits them
    assert_eq!(stats.c_nodefaces, 6);
    assert!(ctx.output.faces.is_empty());
    assert!(ctx.output.surfedges.is_empty());
    assert_eq!(leaf_markfaces(&tree, interior).len(), 6);
}

#[test]
fn pipeline_output_is_deterministic() {
    fn emit_once() -> (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>) {
        let mut ctx = CompileContext::new(Options::default());
        let texinfo = plain_texinfo(&mut ctx);
        let mut tree = Tree::new();

        let (root, _) = build_box_room(
            &mut ctx,
            &mut tree,
            [0.0, 0.0, 0.0],
            [128.0, 64.0, 64.0],
            Contents::EMPTY,
            texinfo,
        );

        run_pipeline(&mut ctx, &mut tree, root);

        (
            bytemuck::cast_slice(&ctx.output.planes).to_vec(),
            bytemuck::cast_slice(&ctx.output.texinfos).to_vec(),
            bytemuck::cast_slice(&ctx.output.faces).to_vec(),
            bytemuck::cast_slice(&ctx.output.surfedges).to_vec(),
            bytemuck::cast_slice(&ctx.vertex_lump()).to_vec(),
            bytemuck::cast_slice(&ctx.edge_lump()).to_vec(),
        )
    }

    let first = emit_once();
    let second = emit_once();

    assert_eq!(first.0, second.0, "plane lump drifted");
    assert_eq!(first.1, second.1, "texinfo lump drifted");
    assert_eq!(first.2, second.2, "face lump drifted");
    assert_eq!(first.3, second.3, "surfedge lump drifted");
    assert_eq!(first.4, second.4, "vertex lump drifted");
    assert_eq!(first.5, second.5, "edge lump drifted");
}

#[test]
fn freeing_the_tree_releases_faces_and_portals() {
    let mut ctx = CompileContext::default();
    let texinfo = plain_texinfo(&mut ctx);
    let mut tree = Tree::new();

    let (root, _) = build_box_room(
        &mut ctx,
        &mut tree,
        [0.0, 0.0, 0.0],
        [64.0, 64.0, 64.0],
        Contents::EMPTY,
        texinfo,
    );

    run_pipeline(&mut ctx, &mut tree, root);
    assert!(!tree.faces.is_empty());
    assert!(!tree.portals.is_empty());

    tree.free_nodes();

    assert!(tree.nodes.is_empty());
    assert!(tree.portals.is_empty());
    assert!(tree.faces.is_empty());

    // the compile-wide tables survive the tree
    assert_eq!(ctx.vertexes.len(), 8);
}

// pipeline.rs
