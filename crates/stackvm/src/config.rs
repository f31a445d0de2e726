use stackvm_types::MAX_PAGES;

/// Default limit on nested function activations.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 3000;

/// Configuration for an [`ExecutionContext`](crate::ExecutionContext).
///
/// ```rust
/// use stackvm::Config;
///
/// let config = Config::new().with_max_call_depth(512).with_run_start(false);
/// assert_eq!(config.max_call_depth(), 512);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    max_call_depth: usize,
    default_max_memory_pages: u32,
    validate_before_run: bool,
    run_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            default_max_memory_pages: MAX_PAGES,
            validate_before_run: true,
            run_start: true,
        }
    }
}

impl Config {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exceeding this many active call frames traps with [`Trap::CallStackOverflow`](crate::Trap::CallStackOverflow).
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Page ceiling for memories that declare no maximum. Clamped to the 32-bit limit.
    pub fn with_default_max_memory_pages(mut self, pages: u32) -> Self {
        self.default_max_memory_pages = pages.min(MAX_PAGES);
        self
    }

    /// Strictly validate every function body on instantiation.
    pub fn with_validate_before_run(mut self, validate: bool) -> Self {
        self.validate_before_run = validate;
        self
    }

    /// Run the module's start function on instantiation.
    pub fn with_run_start(mut self, run_start: bool) -> Self {
        self.run_start = run_start;
        self
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    pub fn default_max_memory_pages(&self) -> u32 {
        self.default_max_memory_pages
    }

    pub fn validate_before_run(&self) -> bool {
        self.validate_before_run
    }

    pub fn run_start(&self) -> bool {
        self.run_start
    }
}
