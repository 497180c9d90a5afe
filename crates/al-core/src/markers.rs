mod sealed {
    /// Private marker traits ensure all required traits are impl'd while users never impl them by hand
    pub trait TimeoutKeyRequirements:
        'static + Send + Sync + Clone + Eq + std::hash::Hash + std::fmt::Debug
    {
    }

    pub trait RecurringFnRequirements: FnMut() + Send + 'static {}
}

/// `TimeoutKeyRequirements` marks types usable as keys in a `TimeoutMap`
/// Blanket impl'd for every `'static + Send + Sync + Clone + Eq + Hash + Debug` type
pub trait TimeoutKeyRequirements: sealed::TimeoutKeyRequirements {}
impl<T: 'static + Send + Sync + Clone + Eq + std::hash::Hash + std::fmt::Debug>
    sealed::TimeoutKeyRequirements for T
{
}
impl<T: sealed::TimeoutKeyRequirements> TimeoutKeyRequirements for T {}

/// `RecurringFn` is the closure a `Scheduler` runs once per period
pub trait RecurringFn: sealed::RecurringFnRequirements {}
impl<T: FnMut() + Send + 'static> sealed::RecurringFnRequirements for T {}
impl<T: sealed::RecurringFnRequirements> RecurringFn for T {}
