///! BSP tree, portal graph and face storage consumed by the output pipeline.

use std::num::NonZeroU32;

use crate::{game::Contents, geom};

/// Face materialisation, merging and subdivision
pub mod faces;

/// Mark-surface assignment and table emission
pub mod emit;

/// Output table records
pub mod lumps;

/// Id type
pub trait Id: Copy + Clone + Eq + PartialEq + std::hash::Hash + std::fmt::Debug + Ord + PartialOrd {
    fn from_index(index: usize) -> Self;

    fn into_index(self) -> usize;
}

/// Generic id implementation
macro_rules! impl_id {
    ($name: ident) => {
        /// Unique identifier
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
        pub struct $name(NonZeroU32);

        impl Id for $name {
            /// Build id from index
            fn from_index(index: usize) -> Self {
                $name(NonZeroU32::try_from(index as u32 + 1).unwrap())
            }

            /// Get index by id
            fn into_index(self) -> usize {
                self.0.get() as usize - 1
            }
        }
    };
}

impl_id!(NodeId);
impl_id!(PortalId);
impl_id!(FaceId);

/// Back-reference to the brush side a portal surface came from
#[derive(Copy, Clone, Debug)]
pub struct SideRef {
    /// Plane table index
    pub planenum: usize,

    /// Which side of the plane the side faces (0 front, 1 back)
    pub planeside: usize,

    /// Texinfo table index
    pub texinfo: usize,

    /// Lightmap scale shift
    pub lmshift: u8,
}

/// Convex contact between two leaves across a node plane
pub struct Portal {
    pub winding: geom::Winding,

    /// Bridged leaves; the winding faces `nodes[0]`
    pub nodes: [NodeId; 2],

    /// Per-side continuation of each leaf's portal chain
    pub next: [Option<PortalId>; 2],

    /// Node whose splitter plane the portal lies on
    pub onnode: Option<NodeId>,

    /// Faces generated from the portal, one per side
    pub face: [Option<FaceId>; 2],

    /// Originating brush side, if the portal bridges visible contents
    pub side: Option<SideRef>,
}

/// Windable part of a face: the primary polygon and every clipped
/// sub-polygon share this shape
pub struct FaceFragment {
    pub winding: geom::Winding,

    /// Signed surfedge indices, filled by edge discovery and consumed
    /// by emission
    pub edges: Vec<i32>,

    /// Index in the face lump once emitted
    pub output_number: Option<u32>,
}

impl FaceFragment {
    pub fn new(winding: geom::Winding) -> Self {
        Self {
            winding,
            edges: Vec::new(),
            output_number: None,
        }
    }
}

/// Textured oriented convex surface
pub struct Face {
    pub primary: FaceFragment,

    /// Sub-polygons attached by later passes; owned by this face
    pub fragments: Vec<FaceFragment>,

    /// Plane table index
    pub planenum: usize,

    /// 0 if the face looks along the plane normal, 1 against it
    pub planeside: usize,

    /// Texinfo table index
    pub texinfo: usize,

    /// Contents of the bounded solid
    pub contents: Contents,

    pub lmshift: u8,

    /// Portal the face was born from
    pub portal: Option<PortalId>,
}

pub enum NodeKind {
    /// Splitter node
    Internal {
        /// Plane table index of the splitter
        planenum: usize,

        /// Front and back children
        children: [NodeId; 2],

        /// Faces lying on the splitter
        faces: Vec<FaceId>,

        /// First owned entry of the face lump, stamped by emission
        firstface: u32,

        /// Owned face lump range length, stamped by emission
        numfaces: u32,
    },

    /// Region of homogeneous contents
    Leaf {
        contents: Contents,

        /// Faces touching the leaf region
        markfaces: Vec<FaceId>,

        /// Head of the leaf's portal chain
        portals: Option<PortalId>,
    },
}

pub struct Node {
    pub bounds: geom::BoundBox,
    pub kind: NodeKind,
}

/// Source entity owning one BSP tree
pub struct Entity {
    /// First face lump index of the entity, set once by emission
    pub first_output_face: Option<u32>,
}

impl Entity {
    pub fn new() -> Self {
        Self {
            first_output_face: None,
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

/// Arena storage of one entity's BSP: nodes, portals and faces with
/// stable indices. Dropping the tree releases everything it owns.
pub struct Tree {
    pub nodes: Vec<Node>,
    pub portals: Vec<Portal>,
    pub faces: Vec<Face>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            portals: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.into_index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.into_index()]
    }

    pub fn portal(&self, id: PortalId) -> &Portal {
        &self.portals[id.into_index()]
    }

    pub fn portal_mut(&mut self, id: PortalId) -> &mut Portal {
        &mut self.portals[id.into_index()]
    }

    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.into_index()]
    }

    pub fn face_mut(&mut self, id: FaceId) -> &mut Face {
        &mut self.faces[id.into_index()]
    }

    pub fn add_leaf(&mut self, contents: Contents, bounds: geom::BoundBox) -> NodeId {
        self.nodes.push(Node {
            bounds,
            kind: NodeKind::Leaf {
                contents,
                markfaces: Vec::new(),
                portals: None,
            },
        });

        NodeId::from_index(self.nodes.len() - 1)
    }

    pub fn add_node(&mut self, planenum: usize, children: [NodeId; 2], bounds: geom::BoundBox) -> NodeId {
        self.nodes.push(Node {
            bounds,
            kind: NodeKind::Internal {
                planenum,
                children,
                faces: Vec::new(),
                firstface: 0,
                numfaces: 0,
            },
        });

        NodeId::from_index(self.nodes.len() - 1)
    }

    pub fn add_face(&mut self, face: Face) -> FaceId {
        self.faces.push(face);

        FaceId::from_index(self.faces.len() - 1)
    }

    /// Contents of a leaf node
    pub fn leaf_contents(&self, id: NodeId) -> Contents {
        match &self.node(id).kind {
            NodeKind::Leaf { contents, .. } => *contents,
            NodeKind::Internal { .. } => panic!("node {id:?} is not a leaf"),
        }
    }

    /// Create a portal bridging two leaves and link it into both leaf
    /// portal chains. The winding must face `front`.
    pub fn add_portal(
        &mut self,
        winding: geom::Winding,
        front: NodeId,
        back: NodeId,
        onnode: Option<NodeId>,
        side: Option<SideRef>,
    ) -> PortalId {
        let id = PortalId::from_index(self.portals.len());

        let mut portal = Portal {
            winding,
            nodes: [front, back],
            next: [None, None],
            onnode,
            face: [None, None],
            side,
        };

        for (chain_side, node_id) in [front, back].into_iter().enumerate() {
            let NodeKind::Leaf { portals, .. } = &mut self.node_mut(node_id).kind else {
                panic!("portal endpoint {node_id:?} is not a leaf");
            };

            portal.next[chain_side] = *portals;
            *portals = Some(id);
        }

        self.portals.push(portal);

        id
    }

    /// Release every node of the tree together with its faces and portals
    pub fn free_nodes(&mut self) {
        self.nodes.clear();
        self.portals.clear();
        self.faces.clear();
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}


// mod.rs
