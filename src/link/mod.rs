/*!
 * Link Module
 * Link/monitor relations and exit propagation
 */

mod propagate;
pub mod table;

pub use table::LinkTable;
