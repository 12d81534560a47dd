mod actor;
mod candidate;
mod config;
mod coordinator;
mod rendezvous;
mod signal;
#[cfg(test)]
mod testing;
mod ui;
pub use actor::*;
pub use candidate::*;
pub use config::*;
pub use coordinator::*;
pub use rendezvous::*;
pub use signal::*;
pub use ui::*;
