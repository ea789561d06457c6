//! Script toolchain: lexical scan, module resolution, bundling,
//! minification and source maps.

pub mod bundle;
pub mod minify;
pub mod resolve;
pub mod scan;
pub mod sourcemap;

pub use bundle::{bundle, Bundle, BundleError};
pub use minify::minify;
pub use sourcemap::SourceMapBuilder;
