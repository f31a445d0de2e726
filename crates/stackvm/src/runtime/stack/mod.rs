mod block_stack;
mod call_stack;
mod value_stack;

pub(crate) use block_stack::{BlockFrame, BlockStack};
pub(crate) use call_stack::{CallFrame, CallStack};
pub(crate) use value_stack::ValueStack;
