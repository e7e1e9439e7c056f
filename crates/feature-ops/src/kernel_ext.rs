use geom_kernel::{Kernel, KernelQuery};

/// Combined trait for operations that need both mutable Kernel access
/// and read-only KernelQuery access on the same object.
///
/// This avoids the borrow-checker issue of needing &mut and & on the same value.
pub trait KernelBundle: Kernel + KernelQuery {
    fn as_query(&self) -> &dyn KernelQuery;
}

impl<T: Kernel + KernelQuery> KernelBundle for T {
    fn as_query(&self) -> &dyn KernelQuery {
        self
    }
}
