//! # wigner-dmatrix: Precomputed Wigner small-d rotation-matrix tables
//!
//! This crate provides the eager generation and constant-time lookup of
//! Wigner small-d rotation-matrix elements $`d^{j}_{mn}(\beta)`$ for all
//! integer angular momenta $`j`$ up to a caller-supplied maximum, at a fixed
//! rotation angle $`\beta`$.
//!
//! The table is built once per $`(l_{\mathrm{max}}, \beta)`$ pair using an
//! upward three-term recursion in $`j`$ seeded by closed-form edge elements,
//! with explicit limiting-value branches at the singular angles
//! $`\beta \equiv 0`$ and $`\beta \equiv \pi \pmod{2\pi}`$. Once built, the
//! table is immutable and can be shared freely between concurrent readers.
//!
//! For most items, their usages are illustrated in test functions.

pub mod angmom;
