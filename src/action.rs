#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Refresh,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ScrollTop,
    None,
}
