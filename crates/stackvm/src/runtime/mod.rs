mod context;
mod interpreter;
mod stack;

pub use context::ExecutionContext;
pub use interpreter::Step;
