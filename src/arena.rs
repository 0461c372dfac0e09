//! Order Arena - fixed-capacity slab with an intrusive LIFO free list.
//!
//! The arena pre-allocates every slot at construction and never grows,
//! so allocation latency and memory footprint are bounded. The most
//! recently freed slot is handed out first, which keeps bursts of
//! matching activity on warm cache lines.

use std::fmt;

use crate::order::Order;

/// Sentinel value terminating the free list
pub const NULL_INDEX: u32 = u32::MAX;

/// Owning reference to an allocated slot.
///
/// Not `Clone` or `Copy`: `allocate` is the only way to obtain one and
/// `deallocate` consumes it, so a handle cannot outlive its slot. The
/// generation catches handles that survive an arena `reset`.
/// Issued generations are always odd.
#[derive(Debug, PartialEq, Eq)]
pub struct OrderHandle {
    index: u32,
    generation: u32,
}

impl OrderHandle {
    /// Slot index inside the arena
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// One arena slot - 32 bytes, two per cache line.
///
/// | Field      | Type  | Offset | Size |
/// |------------|-------|--------|------|
/// | order      | Order | 0      | 24   |
/// | generation | u32   | 24     | 4    |
/// | next_free  | u32   | 28     | 4    |
#[repr(C, align(32))]
#[derive(Clone, Copy)]
struct Slot {
    order: Order,
    /// Odd while allocated, even while free
    generation: u32,
    /// Free-list link, only meaningful while the slot is free
    next_free: u32,
}

const _: () = assert!(
    std::mem::size_of::<Slot>() == 32,
    "Slot must be exactly 32 bytes"
);

/// Pre-allocated order storage with O(1) allocate and deallocate.
pub struct OrderArena {
    slots: Vec<Slot>,
    /// Head of the free list
    free_head: u32,
    allocated_count: u32,
    capacity: u32,
}

impl OrderArena {
    /// Create an arena holding at most `capacity` live orders.
    ///
    /// # Panics
    /// Panics if capacity is not below `NULL_INDEX`.
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < NULL_INDEX, "Capacity must be less than NULL_INDEX");

        let slots = vec![
            Slot {
                order: Order::empty(),
                generation: 0,
                next_free: NULL_INDEX,
            };
            capacity as usize
        ];

        let mut arena = Self {
            slots,
            free_head: NULL_INDEX,
            allocated_count: 0,
            capacity,
        };
        arena.thread_free_list();
        arena
    }

    /// Chain every slot into the free list in index order.
    fn thread_free_list(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.next_free = i as u32 + 1;
        }
        if let Some(last) = self.slots.last_mut() {
            last.next_free = NULL_INDEX;
        }
        self.free_head = if self.capacity > 0 { 0 } else { NULL_INDEX };
        self.allocated_count = 0;
    }

    /// Allocate a slot and store `order` in it.
    ///
    /// Returns `None` when every slot is in use; never blocks or grows.
    #[inline]
    pub fn allocate(&mut self, order: Order) -> Option<OrderHandle> {
        if self.free_head == NULL_INDEX {
            return None;
        }

        let index = self.free_head;
        let slot = &mut self.slots[index as usize];
        self.free_head = slot.next_free;
        slot.next_free = NULL_INDEX;
        slot.generation = slot.generation.wrapping_add(1);
        slot.order = order;
        self.allocated_count += 1;

        Some(OrderHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Release a slot back to the free list and return its final contents.
    #[inline]
    pub fn deallocate(&mut self, handle: OrderHandle) -> Order {
        debug_assert!(handle.index < self.capacity, "Index out of bounds");
        debug_assert!(self.allocated_count > 0, "Double free detected");

        let slot = &mut self.slots[handle.index as usize];
        debug_assert_eq!(slot.generation, handle.generation, "Stale handle");

        let order = slot.order;
        slot.order = Order::empty();
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = self.free_head;
        self.free_head = handle.index;
        self.allocated_count -= 1;
        order
    }

    /// Return every slot to the free list.
    ///
    /// Meant for use between independent runs. Handles issued before the
    /// reset become stale and are rejected by `try_get`.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.order = Order::empty();
            if slot.generation & 1 == 1 {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.thread_free_list();
    }

    #[inline]
    pub fn get(&self, handle: &OrderHandle) -> &Order {
        let slot = &self.slots[handle.index as usize];
        debug_assert_eq!(slot.generation, handle.generation, "Stale handle");
        &slot.order
    }

    #[inline]
    pub fn get_mut(&mut self, handle: &OrderHandle) -> &mut Order {
        let slot = &mut self.slots[handle.index as usize];
        debug_assert_eq!(slot.generation, handle.generation, "Stale handle");
        &mut slot.order
    }

    /// Checked access: `None` if the handle predates a reset or belongs
    /// to a different arena.
    pub fn try_get(&self, handle: &OrderHandle) -> Option<&Order> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation & 1 == 1 && slot.generation == handle.generation)
            .map(|slot| &slot.order)
    }

    /// Number of live orders
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.allocated_count
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of slots still available
    #[inline]
    pub fn available(&self) -> u32 {
        self.capacity - self.allocated_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_head == NULL_INDEX
    }

    /// Pre-fault all memory pages (warm-up routine).
    ///
    /// Touches every slot so the OS maps the pages before the hot path runs.
    pub fn warm_up(&mut self) {
        for slot in &mut self.slots {
            // SAFETY: `slot` is a valid, exclusive reference into `self.slots`.
            unsafe {
                std::ptr::write_volatile(&mut slot.order.quantity, slot.order.quantity);
            }
        }
    }
}

impl fmt::Debug for OrderArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderArena")
            .field("capacity", &self.capacity)
            .field("allocated", &self.allocated_count)
            .field("free_head", &self.free_head)
            .finish()
    }
}
