pub mod article;
pub mod edit;
pub mod generate;
pub mod image;
pub mod post;
pub mod post_version;

pub use article::*;
pub use edit::*;
pub use generate::*;
pub use image::*;
pub use post::*;
pub use post_version::*;
