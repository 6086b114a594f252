//! Deterministic color assignment for card labels.
//!
//! A label created without an explicit color gets one picked from a fixed
//! palette by hashing its name, so "bug" is the same color on every card and
//! every board.

/// Label palette (6-char hex without `#`).
const PALETTE: &[&str] = &[
    "10b981", // emerald
    "3b82f6", // blue
    "f59e0b", // amber
    "f43f5e", // rose
    "8b5cf6", // violet
    "64748b", // slate
    "14b8a6", // teal
    "f97316", // orange
    "ec4899", // pink
    "84cc16", // lime
];

/// Return a deterministic color for a label name.
pub fn auto_color(name: &str) -> &'static str {
    let idx = (fnv1a(name) as usize) % PALETTE.len();
    PALETTE[idx]
}

/// FNV-1a hash (32-bit) for short strings.
fn fnv1a(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in s.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
