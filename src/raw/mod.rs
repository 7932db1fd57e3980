mod arena;
mod handle;
mod node;
mod raw_two_four_tree;
mod render;
mod validate;

pub(crate) use raw_two_four_tree::{Position, RawTwoFourTree};
pub use validate::Violation;
