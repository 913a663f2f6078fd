//! Per-cycle scratch storage threaded through a single pod's scheduling
//! cycle. Grounded in the teacher's `cycle_state.rs`; the `skip_*_plugins`
//! bookkeeping of the teacher's version is dropped along with the
//! PreFilter/PreScore extension points it served (see DESIGN.md).

use std::any::Any;
use std::collections::HashMap;

#[derive(Default)]
pub struct CycleState {
    storage: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl CycleState {
    pub fn read<T: 'static>(&self, key: &str) -> Option<&T> {
        self.storage.get(key).and_then(|v| v.downcast_ref())
    }

    pub fn write(&mut self, key: &str, value: Box<dyn Any + Send + Sync>) {
        self.storage.insert(key.to_string(), value);
    }
}
