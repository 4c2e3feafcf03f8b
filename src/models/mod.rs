pub mod outfit;
pub mod photo;
pub mod prompt;
pub mod upload;
pub mod usage;
pub mod user;
pub mod wardrobe;

pub use outfit::*;
pub use photo::*;
pub use prompt::*;
pub use upload::*;
pub use usage::*;
pub use user::*;
pub use wardrobe::*;
