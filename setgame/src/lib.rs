pub use cards::*;
pub use errors::*;
pub use rules::*;
pub use table::*;
pub use tokens::*;
pub use ui::*;

mod cards;
mod errors;
mod rules;
mod table;
mod tokens;
mod ui;
