// Context menu handler for Windows Explorer
// Explorer creates it through the class factory after finding the CLSID in the registry

mod explorer_command;
mod factory;

pub use explorer_command::ParallelExplorerCommand;
pub use factory::ParallelCommandFactory;

use crate::keys::CLSID_PARALLEL_COMMAND_U128;
use windows::core::GUID;

pub const CLSID_EXPLORER_COMMAND: GUID = GUID::from_u128(CLSID_PARALLEL_COMMAND_U128);
