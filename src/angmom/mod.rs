//! Angular momentum rotation matrices.

pub mod wigner_small_d;
