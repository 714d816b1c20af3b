pub mod feedback;
pub mod page;

pub use feedback::*;
pub use page::*;
