pub mod logging;
pub use logging::{StdoutLogger, init_stdout_logger};

mod vec2;
pub use vec2::*;
