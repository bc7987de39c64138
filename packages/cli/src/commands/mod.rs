pub mod apply;
pub mod assign_ids;
pub mod init;
pub mod lint;

pub use apply::{apply, ApplyArgs};
pub use assign_ids::{assign_ids, AssignIdsArgs};
pub use init::{init, InitArgs};
pub use lint::{lint, LintArgs};
