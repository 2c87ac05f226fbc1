use crate::fixed_point::{Action, Event};

/// Watches a fixed-point solve one iteration at a time.
///
/// Returning [`Action::StopEarly`] ends the solve after the current
/// candidate has been accepted; `None` lets it continue.
///
/// Closures taking `&Event<'_>` are observers, and `()` watches nothing.
/// State captured by a closure can be read back once the solve returns.
pub trait Observer {
    /// Receives one iteration.
    fn observe(&mut self, event: &Event<'_>) -> Option<Action>;
}

impl<F> Observer for F
where
    F: FnMut(&Event<'_>) -> Option<Action>,
{
    fn observe(&mut self, event: &Event<'_>) -> Option<Action> {
        self(event)
    }
}

impl Observer for () {
    fn observe(&mut self, _: &Event<'_>) -> Option<Action> {
        None
    }
}
