//! Core data models: generated artifacts, league inputs and standings.

mod aggregate;
mod duel;
mod league;
mod night;
mod performance;
mod roster;
mod season;
mod sonmac;

pub use aggregate::*;
pub use duel::*;
pub use league::*;
pub use night::*;
pub use performance::*;
pub use roster::*;
pub use season::*;
pub use sonmac::*;
