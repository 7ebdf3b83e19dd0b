pub mod aggregate;
pub mod correlator;
pub mod expansion;
pub mod loader;
pub mod monitor;
pub mod paginator;
pub mod result_table;

pub use aggregate::RunAggregate;
pub use correlator::{correlate, Replay, ReplayDay, TickIndex};
pub use expansion::ExpansionState;
pub use loader::{ReplayLoad, RunSnapshot, SimulationService};
pub use monitor::{apply_if_newer, MonitorState, RunMonitor};
pub use paginator::{Collection, Halt, PageSource, Paginator};
pub use result_table::{
    derive_view, NumericRange, ResultFilters, ResultTable, SortDirection, SortField, SortSpec,
};
