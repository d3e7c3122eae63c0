//! Geometric output back-end of a quake-style BSP compiler.
//!
//! The pipeline runs after brushes have been CSG-merged into a BSP tree and
//! portals have been flooded onto its leaves:
//!
//! * [`make_faces`] materialises faces from portals, then merges and
//!   subdivides them per node,
//! * [`make_mark_faces`] clips each node's faces down to every leaf they
//!   overlap,
//! * [`make_face_edges`] emits faces, vertices and edges into the output
//!   tables.
//!
//! All compile-wide state lives in an explicit [`CompileContext`]; the core
//! performs no I/O and aborts on broken invariants instead of returning
//! errors.

/// Basic math utility
pub mod math;

/// Basic geometry
pub mod geom;

/// Game content rules
pub mod game;

/// Deduplicating output tables
pub mod tables;

/// BSP tree and the output pipeline
pub mod bsp;

use bsp::lumps::BspOutput;
use game::{GameRules, TargetGame, Texinfo};
use tables::{EdgeTable, PlaneTable, VertexTable};

pub use bsp::emit::{make_face_edges, make_mark_faces};
pub use bsp::faces::{make_faces, MakeFacesStats};

/// Compile options bag
pub struct Options {
    /// Maximum texture-space extent before a face is chopped; 0 disables
    /// subdivision
    pub subdivide: u32,

    /// Disable the per-node face merger
    pub nomerge: bool,

    /// Emit skip-flagged faces anyway
    pub includeskip: bool,

    /// Game whose content rules drive face generation
    pub target_game: TargetGame,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            subdivide: 240,
            nomerge: false,
            includeskip: false,
            target_game: TargetGame::Quake1,
        }
    }
}

/// Compile-wide state shared by every stage: the deduplicating tables, the
/// texinfo list and the output lumps. Tables grow monotonically over the
/// whole compile; entities are emitted one at a time.
pub struct CompileContext {
    pub options: Options,
    pub planes: PlaneTable,
    pub texinfos: Vec<Texinfo>,
    pub vertexes: VertexTable,
    pub edges: EdgeTable,
    pub output: BspOutput,
}

impl CompileContext {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            planes: PlaneTable::new(),
            texinfos: Vec::new(),
            vertexes: VertexTable::new(),
            edges: EdgeTable::new(),
            output: BspOutput::new(),
        }
    }

    /// Rules object of the configured target game
    pub fn game(&self) -> &'static dyn GameRules {
        self.options.target_game.rules()
    }

    pub fn add_texinfo(&mut self, texinfo: Texinfo) -> usize {
        self.texinfos.push(texinfo);

        self.texinfos.len() - 1
    }

    /// Vertex lump view for the writer
    pub fn vertex_lump(&self) -> Vec<bsp::lumps::DVertex> {
        self.vertexes
            .points()
            .iter()
            .map(|point| bsp::lumps::DVertex {
                point: [point.x as f32, point.y as f32, point.z as f32],
            })
            .collect()
    }

    /// Edge lump view for the writer
    pub fn edge_lump(&self) -> Vec<bsp::lumps::DEdge> {
        self.edges.edges().iter().map(|v| bsp::lumps::DEdge { v: *v }).collect()
    }
}

impl Default for CompileContext {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

// lib.rs
