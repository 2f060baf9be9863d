// SPDX-License-Identifier: GPL-3.0-only

//! Barcode acquisition
//!
//! Everything between a raster frame and a decoded ISBN payload lives
//! here: the EAN-13 row decoder, the multi-orientation decode step, and
//! the interactive acquisition loop.

pub mod decode;
pub mod ean13;
pub mod session;
