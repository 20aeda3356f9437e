//! Optional control-process machinery (§4.5, §4.6): a peer measurement process under idle load,
//! used as a concurrent baseline, plus a watchdog that kills a process when its stdin closes.

pub mod stdin_sever;
pub mod supervisor;

pub use stdin_sever::StdinSeverMonitor;
pub use supervisor::ControlProcessSupervisor;
