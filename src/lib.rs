#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    unreachable_pub,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications
)]
#![allow(clippy::uninlined_format_args)]

pub mod binary;
pub mod compression;
pub mod encoder;
pub mod interpreter;
pub mod loader;
pub mod tilemap;
pub mod validator;
pub mod wrappers;

pub use binary::errors::{DecodeError, EncodeError};
pub use compression::{Compression, CompressionError, Zlib};
pub use encoder::{encode, EncodeMode, EncodeOptions};
pub use loader::{AsepriteFile, DecodeImages, DecodeOptions};
pub use validator::{validate, Issue, IssueCode, Severity};
