//! Dependency ordering within a layer.
//!
//! Effect B depends on effect A when applying A would change the set of
//! objects B applies to. Dependent effects wait for the effects they depend
//! on; otherwise timestamp order holds. When every remaining effect depends
//! on another one (a dependency loop) the earliest timestamp goes first.

/// Pick the next effect to apply.
///
/// `count` candidates are indexed in timestamp order. `depends(b, a)` reports
/// whether candidate `b` depends on candidate `a`. Returns the index of the
/// earliest candidate that depends on no other remaining candidate, or 0 in a
/// dependency loop.
pub(crate) fn pick_next(count: usize, mut depends: impl FnMut(usize, usize) -> bool) -> usize {
    (0..count)
        .find(|&b| !(0..count).any(|a| a != b && depends(b, a)))
        .unwrap_or(0)
}
