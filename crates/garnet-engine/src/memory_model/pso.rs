use super::{Event, MemoryModel};
use crate::config::MemoryModelKind;

/// Partial store order: store buffers are per address, so a write may also be
/// overtaken by a later write to a different address. Writes to one address
/// stay in program order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pso;

impl MemoryModel for Pso {
    fn kind(&self) -> MemoryModelKind {
        MemoryModelKind::Pso
    }

    fn relaxes(&self, earlier: &Event, later: &Event) -> bool {
        earlier.is_write && !(later.is_write && earlier.same_address(later))
    }

    fn orders_own_reads_from(&self) -> bool {
        false
    }
}
