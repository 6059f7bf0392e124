use super::{Event, MemoryModel};
use crate::config::MemoryModelKind;

/// Sequential consistency: one total order of all events that respects every
/// thread's program order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sc;

impl MemoryModel for Sc {
    fn kind(&self) -> MemoryModelKind {
        MemoryModelKind::Sc
    }

    fn relaxes(&self, _earlier: &Event, _later: &Event) -> bool {
        false
    }

    fn orders_own_reads_from(&self) -> bool {
        true
    }
}
