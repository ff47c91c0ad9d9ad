//! Monochromatic pupil function and point-spread function of the eye from OSA
//! Zernike coefficients, with optional Stiles-Crawford apodization.

pub mod common;
pub mod domain;
pub mod io;
pub mod numerics;
pub mod psf;
pub mod pupil;
pub mod regression;
pub mod sce;
