//! Input parsing for media references and interactive selections.
//!
//! Free text typed by the user is first tried against the catalog URI and
//! web-link forms for every media kind; anything that does not match is
//! treated as a search term by the caller.
//!
//! # Example
//!
//! ```
//! use tunefetch_core::parser::{MediaKind, resolve_input};
//!
//! let reference = resolve_input("spotify:album:6akEvsycLGftJxYudPjmqK").unwrap();
//! assert_eq!(reference.kind, MediaKind::Album);
//! assert!(resolve_input("daft punk").is_none());
//! ```

mod error;
mod media;
mod selection;

pub use error::SelectionError;
pub use media::{MediaKind, MediaReference, resolve_input};
pub use selection::parse_selection;
