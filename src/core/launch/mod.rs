pub mod arguments;
pub mod diagnostics;
pub mod log_sink;
pub mod natives;
pub mod partition;
pub mod pipeline;
pub mod request;
pub mod supervisor;

pub use arguments::{
    build_arguments, format_command_line, split_path_argument, ArgumentContext,
    DEFAULT_MEMORY_FLOOR_MB,
};
pub use log_sink::{GameLogSink, OutputStream};
pub use partition::{partition, ClasspathPlan, Placement};
pub use pipeline::{LaunchPlan, Launcher};
pub use request::{LaunchRequest, MemoryBounds, WindowGeometry};
pub use supervisor::{LaunchCommand, LaunchProcess, ProcessHooks, ProcessState, ProcessSupervisor};
