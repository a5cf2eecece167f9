pub mod category;
pub mod payload;

pub use category::MessageCategory;
pub use payload::Payload;
