//! QR symbol encoder.
//!
//! Encodes text into an ISO/IEC 18004 QR matrix: mode segmentation, version
//! selection, Reed-Solomon error correction, block interleaving, functional
//! pattern placement, and penalty-optimised masking. The finished symbol can
//! be rasterised ([`QR::render`]) or written as a styled SVG ([`render`]).
//!
//! ```no_run
//! use qrsmith::{ECLevel, QRBuilder};
//!
//! let qr = QRBuilder::new(b"HELLO WORLD").ec_level(ECLevel::M).build().unwrap();
//! println!("{}", qr.to_str(1));
//! ```

pub mod builder;
mod common;
pub mod render;

pub use builder::{Module, QRBuilder, QR};
pub use common::codec::Mode;
pub use common::error::{QRError, QRResult};
pub use common::mask::MaskPattern;
pub use common::metadata::{self_check, Color, ECLevel, Version};
