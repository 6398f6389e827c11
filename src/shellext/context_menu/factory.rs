use super::ParallelExplorerCommand;
use crate::shellext::guard::host_call;
use crate::shellext::{lock_server, unlock_server};
use windows::{
    Win32::{Foundation::*, System::Com::*},
    core::*,
};

// Class factory for creating instances of our context menu handler
#[implement(IClassFactory)]
pub struct ParallelCommandFactory;

impl IClassFactory_Impl for ParallelCommandFactory_Impl {
    fn CreateInstance(
        &self,
        outer: Option<&IUnknown>,
        iid: *const GUID,
        result: *mut *mut core::ffi::c_void,
    ) -> Result<()> {
        host_call("CreateInstance", || {
            if result.is_null() {
                return Err(Error::from(E_POINTER));
            }
            unsafe { result.write(std::ptr::null_mut()) };

            if outer.is_some() {
                return Err(Error::from(CLASS_E_NOAGGREGATION));
            }

            let handler: IUnknown = ParallelExplorerCommand::new().into();
            unsafe { handler.query(iid, result).ok() }
        })
    }

    fn LockServer(&self, lock: BOOL) -> Result<()> {
        if lock.as_bool() {
            lock_server();
        } else {
            unlock_server();
        }
        Ok(())
    }
}
