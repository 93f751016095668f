mod batch;
mod detect;
mod output;
mod select;
mod verify;

pub use batch::cmd_batch;
pub use detect::cmd_detect;
pub use select::{cmd_fast, cmd_select};
pub use verify::cmd_verify;
