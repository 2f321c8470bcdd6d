//! Google Photos Library API: media item types, the listing capability trait,
//! and its HTTP implementation.

mod client;
pub mod error;
mod library;
pub mod types;

pub use client::PhotosLibraryClient;
pub use error::LibraryError;
pub use library::MediaLibrary;
pub use types::{MediaItem, MediaPage};
