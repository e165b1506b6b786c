//! Everything that knows the forum's markup.
//!
//! `posts` finds post blocks and their fields, `pagination` reads the
//! next-page affordances, `timestamp` splits the posted-at cell. Nothing
//! outside this module looks at HTML.

pub mod pagination;
pub mod posts;
pub mod timestamp;

pub use pagination::{next_page, PageLinks};
pub use posts::{extract_page, extract_posts, PageExtract};
