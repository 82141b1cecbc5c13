//! Corner-occupancy fill codes and the face-level ids derived from them.
//!
//! A fill code is 8 bits, one per cube corner, with corner `(x, y, z)` at bit
//! `x | y << 1 | z << 2`. Two neighbouring cells share the four corners of the
//! face between them, so a face is described by a 4-bit mask over those corners
//! indexed by the two remaining axes. Masks of touching faces are equal exactly
//! when the cells agree on the shared corners.

use crate::actions::Action;
use crate::direction::Direction;

/// Fill code of the built-in Empty block.
pub const EMPTY_FILL: u8 = 0;
/// Fill code of the built-in Solid block.
pub const SOLID_FILL: u8 = 0xFF;

/// Largest authored base connection id that still fits a composite id.
pub const MAX_BASE_CONNECTION: u32 = (1 << 27) - 1;

/// Integer tag on a block face. 0 is the open id.
pub type ConnectionId = u32;

const fn corner_bit(x: usize, y: usize, z: usize) -> usize {
    x | (y << 1) | (z << 2)
}

const fn map_corner(action: Action, corner: usize) -> usize {
    let x = corner & 1;
    let y = (corner >> 1) & 1;
    let z = (corner >> 2) & 1;
    match action {
        Action::RotateY => corner_bit(1 - z, y, x),
        Action::MirrorX => corner_bit(1 - x, y, z),
        Action::MirrorZ => corner_bit(x, y, 1 - z),
        Action::FlipY => corner_bit(x, 1 - y, z),
    }
}

const fn build_table(action: Action) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut fill = 0;
    while fill < 256 {
        let mut out = 0u8;
        let mut corner = 0;
        while corner < 8 {
            if fill & (1 << corner) != 0 {
                out |= 1 << map_corner(action, corner);
            }
            corner += 1;
        }
        table[fill] = out;
        fill += 1;
    }
    table
}

static ROTATE_Y_TABLE: [u8; 256] = build_table(Action::RotateY);
static MIRROR_X_TABLE: [u8; 256] = build_table(Action::MirrorX);
static MIRROR_Z_TABLE: [u8; 256] = build_table(Action::MirrorZ);
static FLIP_Y_TABLE: [u8; 256] = build_table(Action::FlipY);

/// Transforms a fill code by a single action.
#[inline]
pub fn transform_fill(fill: u8, action: Action) -> u8 {
    let table = match action {
        Action::RotateY => &ROTATE_Y_TABLE,
        Action::MirrorX => &MIRROR_X_TABLE,
        Action::MirrorZ => &MIRROR_Z_TABLE,
        Action::FlipY => &FLIP_Y_TABLE,
    };
    table[fill as usize]
}

/// 4-bit mask of the occupied corners on one face of a cell.
pub fn face_mask(fill: u8, direction: Direction) -> u8 {
    let side = usize::from(direction.is_positive());
    let mut mask = 0u8;
    for b in 0..2 {
        for a in 0..2 {
            let corner = match direction.axis() {
                0 => corner_bit(side, a, b),
                1 => corner_bit(a, side, b),
                _ => corner_bit(a, b, side),
            };
            if fill & (1 << corner) != 0 {
                mask |= 1 << (a + 2 * b);
            }
        }
    }
    mask
}

/// Composite id of one face: the authored id combined with the face mask, so
/// only geometrically compatible faces with the same authored id connect.
#[inline]
pub fn composite_id(base: ConnectionId, fill: u8, direction: Direction) -> ConnectionId {
    (base << 4) | ConnectionId::from(face_mask(fill, direction))
}

/// Composite ids of all six faces.
pub fn composite_ids(base: [ConnectionId; 6], fill: u8) -> [ConnectionId; 6] {
    let mut out = [0; 6];
    for d in Direction::ALL {
        out[d.index()] = composite_id(base[d.index()], fill, d);
    }
    out
}

/// Composite id of an internal big-block seam.
#[inline]
pub fn seam_id(minted: ConnectionId) -> ConnectionId {
    minted << 4
}
