//! cuttermap-parse: PDF parsing backend and content stream interpreter.
//!
//! Opens documents with lopdf, interprets the first page's content stream
//! and reports glyphs, painted paths and placed images through the
//! [`ContentHandler`] trait. It depends on cuttermap-core for shared data
//! types; turning the callbacks into page content is the facade's job.

pub mod cmap;
pub mod error;
pub mod fonts;
pub mod handler;
pub mod interpreter;
pub mod lopdf_backend;
pub mod tokenizer;

pub use cmap::ToUnicodeCMap;
pub use cuttermap_core;
pub use error::BackendError;
pub use fonts::{FontInfo, Glyph};
pub use handler::{CharEvent, ContentHandler, ImageEvent, PathEvent};
pub use interpreter::{Interpreter, ResourceProvider, XObject};
pub use lopdf_backend::{LopdfDocument, LopdfResources};
pub use tokenizer::{Operand, Operator, tokenize};
