pub mod instrument;
pub mod search_result;
pub mod time;

pub use instrument::*;
pub use search_result::*;
pub use time::*;
