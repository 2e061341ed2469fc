//! Lexer, parser, and AST for **tandem scene documents** (`.tsn`).
//!
//! The format is deliberately small: one root node, nested nodes, and
//! `key: value` properties. It carries no rendering knowledge; the scene
//! engine in `tandem-view` decides what each node kind means.
//!
//! ```rust
//! use tandem_scene::parse_str;
//!
//! let doc = parse_str(r#"
//!     Scene {
//!         background: #101820ff
//!         Rect { x: 0  y: 0  width: 100%  height: 48  color: #1e2a38 }
//!     }
//! "#).unwrap();
//! assert_eq!(doc.root.kind, "Scene");
//! assert_eq!(doc.root.children.len(), 1);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Document, Node, Prop, Value};
pub use error::ParseError;
pub use parser::parse_str;
