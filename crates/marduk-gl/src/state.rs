//! Packed render-state keys.
//!
//! Layout of [`StateBits`]:
//! - bits `0..3`: [`PrimitiveType`]
//! - bit `3 + flag`: one bit per [`StateFlag`]
//!
//! The same value selects the pipeline slot and is stored in each draw command.

/// Primitive topology selected by `begin`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum PrimitiveType {
    #[default]
    Points = 0,
    Lines = 1,
    LineStrip = 2,
    Triangles = 3,
    TriangleStrip = 4,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 5] = [
        PrimitiveType::Points,
        PrimitiveType::Lines,
        PrimitiveType::LineStrip,
        PrimitiveType::Triangles,
        PrimitiveType::TriangleStrip,
    ];
}

/// Boolean render state toggled with `enable` / `disable`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum StateFlag {
    DepthTest = 0,
    Blend = 1,
    CullFace = 2,
    Texturing = 3,
}

impl StateFlag {
    pub const ALL: [StateFlag; 4] = [
        StateFlag::DepthTest,
        StateFlag::Blend,
        StateFlag::CullFace,
        StateFlag::Texturing,
    ];

    #[inline]
    const fn mask(self) -> u16 {
        1 << (PRIM_BITS + self as u16)
    }
}

const PRIM_BITS: u16 = 3;
const PRIM_MASK: u16 = (1 << PRIM_BITS) - 1;

/// Number of pipeline cache slots: one per distinct key.
pub const PIPELINE_SLOTS: usize = 1 << (PRIM_BITS as usize + StateFlag::ALL.len());

const _: () = assert!(PIPELINE_SLOTS.is_power_of_two());
const _: () = assert!((PrimitiveType::TriangleStrip as u16) <= PRIM_MASK);
const _: () = assert!((StateFlag::Texturing.mask() as usize) < PIPELINE_SLOTS);

/// Primitive type + render flags packed into 16 bits.
///
/// Value type: every mutator returns a new key. Two keys built from the same
/// primitive type and flag set compare equal regardless of call order.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct StateBits(u16);

impl StateBits {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Raw packed value.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Replaces the primitive type field, keeping all flags.
    #[inline]
    pub const fn with_primitive_type(self, ty: PrimitiveType) -> Self {
        Self((self.0 & !PRIM_MASK) | (ty as u16 & PRIM_MASK))
    }

    #[inline]
    pub const fn primitive_type(self) -> PrimitiveType {
        match self.0 & PRIM_MASK {
            0 => PrimitiveType::Points,
            1 => PrimitiveType::Lines,
            2 => PrimitiveType::LineStrip,
            3 => PrimitiveType::Triangles,
            // Only `with_primitive_type` writes this field.
            _ => PrimitiveType::TriangleStrip,
        }
    }

    #[inline]
    pub const fn enable(self, flag: StateFlag) -> Self {
        Self(self.0 | flag.mask())
    }

    #[inline]
    pub const fn disable(self, flag: StateFlag) -> Self {
        Self(self.0 & !flag.mask())
    }

    #[inline]
    pub const fn is_enabled(self, flag: StateFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Index into the pipeline cache.
    #[inline]
    pub const fn pipeline_slot(self) -> usize {
        self.0 as usize & (PIPELINE_SLOTS - 1)
    }
}
