//! Layout utilities.

/// Whether `addr` is a multiple of `align`.
///
/// `align` must be a power of two.
#[inline]
pub const fn is_aligned(addr: usize, align: usize) -> bool {
    addr & (align - 1) == 0
}
