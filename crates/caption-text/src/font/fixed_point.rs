//! 26.6 fixed-point arithmetic
//!
//! Glyph metrics are produced in 1/64 pixel units and converted to whole
//! pixels by an arithmetic shift. The shift floors toward negative infinity
//! and downstream layout depends on exactly that truncation.

/// 26.6 fixed-point number (32-bit total)
///
/// - 26 bits for integer part
/// - 6 bits for fractional part: precision of 1/64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct F26Dot6(i32);

impl F26Dot6 {
    pub const FRAC_BITS: u32 = 6;
    pub const SCALE: i32 = 1 << Self::FRAC_BITS;

    pub const ZERO: F26Dot6 = F26Dot6(0);

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Get raw bits
    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Create from whole pixels
    #[inline]
    pub const fn from_px(px: i32) -> Self {
        Self(px << Self::FRAC_BITS)
    }

    /// Scale a value in font design units to a pixel size.
    ///
    /// The product is floored so that negative coordinates (descenders,
    /// negative bearings) round the same way as positive ones.
    pub fn from_font_units(units: i32, ppem: u32, units_per_em: u16) -> Self {
        if units_per_em == 0 {
            return Self::ZERO;
        }
        let scaled = i64::from(units) * i64::from(ppem) * i64::from(Self::SCALE);
        let value = scaled.div_euclid(i64::from(units_per_em));
        Self(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    /// Whole pixels, `value >> 6`
    #[inline]
    pub const fn floor_px(self) -> i32 {
        self.0 >> Self::FRAC_BITS
    }

    /// Smallest whole pixel count not below this value
    #[inline]
    pub const fn ceil_px(self) -> i32 {
        (self.0 + Self::SCALE - 1) >> Self::FRAC_BITS
    }
}
