#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    CycleMetric,
    ToggleHelp,
    /// Take a snapshot now instead of waiting for the timer.
    Refresh,
    None,
}
