///! Output table records, laid out for the on-disk writer.

use bytemuck::{AnyBitPattern, NoUninit, Zeroable};

/// Largest point count a face fragment may carry into edge discovery
pub const MAXEDGES: usize = 64;

/// Lighting style slots per face record
pub const MAXLIGHTMAPS: usize = 4;

/// Exported plane record
#[repr(C, packed)]
#[derive(Copy, Clone)]
pub struct DPlane {
    /// Unit normal
    pub normal: [f32; 3],

    /// Signed distance along the normal
    pub dist: f32,

    /// Six-way axis classification
    pub ty: i32,
}

unsafe impl Zeroable for DPlane {}
unsafe impl AnyBitPattern for DPlane {}
unsafe impl NoUninit for DPlane {}

/// Exported vertex record
#[repr(C, packed)]
#[derive(Copy, Clone)]
pub struct DVertex {
    pub point: [f32; 3],
}

unsafe impl Zeroable for DVertex {}
unsafe impl AnyBitPattern for DVertex {}
unsafe impl NoUninit for DVertex {}

/// Exported directed edge record
#[repr(C, packed)]
#[derive(Copy, Clone)]
pub struct DEdge {
    /// Start and end vertex indices
    pub v: [u32; 2],
}

unsafe impl Zeroable for DEdge {}
unsafe impl AnyBitPattern for DEdge {}
unsafe impl NoUninit for DEdge {}

/// Exported texture mapping record
#[repr(C, packed)]
#[derive(Copy, Clone)]
pub struct DTexinfo {
    /// Two texture axis rows: xyz vector plus offset
    pub vecs: [[f32; 4]; 2],

    /// Miptex table index
    pub miptex: i32,

    /// Packed surface flags
    pub flags: i32,
}

unsafe impl Zeroable for DTexinfo {}
unsafe impl AnyBitPattern for DTexinfo {}
unsafe impl NoUninit for DTexinfo {}

/// Exported surface record
#[repr(C, packed)]
#[derive(Copy, Clone)]
pub struct DFace {
    /// Index in the plane lump
    pub planenum: i32,

    /// 0 if the face looks along the plane normal, 1 against it
    pub side: i32,

    /// First entry in the surfedge lump
    pub firstedge: i32,

    /// Count of surfedge entries
    pub numedges: i32,

    /// Index in the texinfo lump
    pub texinfo: i32,

    /// Lighting styles, 255 when unused
    pub styles: [u8; MAXLIGHTMAPS],

    /// Lighting data offset, -1 until lit
    pub lightofs: i32,
}

unsafe impl Zeroable for DFace {}
unsafe impl AnyBitPattern for DFace {}
unsafe impl NoUninit for DFace {}

/// Output lump set grown during emission
#[derive(Default)]
pub struct BspOutput {
    pub planes: Vec<DPlane>,
    pub texinfos: Vec<DTexinfo>,
    pub faces: Vec<DFace>,
    pub surfedges: Vec<i32>,

    /// Side-band lightmap scale lump, kept in lock-step with `faces`
    pub lmshifts: Vec<u8>,

    /// True once any face carries a non-default lmshift
    pub needslmshifts: bool,
}

impl BspOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

// lumps.rs
