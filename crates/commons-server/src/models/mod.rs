pub mod community;
pub mod invitation;
pub mod join_request;
pub mod membership;
pub mod user;

pub use community::*;
pub use invitation::*;
pub use join_request::*;
pub use membership::*;
pub use user::*;
