//! Reference anchor points on the reference body.

/// Target points in placement order: C1, C6, C7, C3, C5, C4, C2.
pub const REFERENCE_ANCHORS: [[f64; 3]; 7] = [
    [596.11, 736.90, 567.51],
    [636.55, 720.73, 621.51],
    [632.55, 729.38, 737.43],
    [616.76, 728.60, 739.97],
    [676.99, 701.09, 758.84],
    [658.10, 707.92, 797.84],
    [623.97, 717.39, 819.96],
];

/// The first `count` anchors. All of them when `count` exceeds the list.
pub fn select(anchors: &[[f64; 3]], count: usize) -> &[[f64; 3]] {
    &anchors[..count.min(anchors.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_takes_a_prefix() {
        let picked = select(&REFERENCE_ANCHORS, 2);
        assert_eq!(picked, &REFERENCE_ANCHORS[..2]);
    }

    #[test]
    fn select_caps_at_available_anchors() {
        assert_eq!(select(&REFERENCE_ANCHORS, 100).len(), 7);
    }
}
