//! Terminal buffer and input coordination for the Custodian console.
//!
//! [`Console`] is the controller: it owns the scrollback, the live input line,
//! history, completion, hints, link health and alert flashes, and is driven
//! entirely through [`ConsoleEvent`]s. [`runtime::run_console`] wires it to a
//! crossterm terminal, a ratatui [`TuiSurface`] and a threaded link port.

pub mod buffer;
pub mod classify;
pub mod completion;
pub mod console;
pub mod dispatch;
pub mod flash;
pub mod hint;
pub mod history;
pub mod map;
pub mod render;
pub mod runtime;
pub mod surface;
pub mod timers;
pub mod tui;

pub use buffer::{ScrollbackBuffer, normalize_assault_spacing};
pub use classify::{HeatLevel, LineTag, classify, is_assault_line, is_critical_line};
pub use console::{Console, ConsoleEvent};
pub use hint::HintState;
pub use map::SectorMap;
pub use render::{RenderedLine, ScrollMetrics};
pub use runtime::run_console;
pub use surface::{CommsState, HintView, Indicator, LinkPort, MapSink, Surface};
pub use tui::TuiSurface;
