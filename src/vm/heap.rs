use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;

use crate::config::{Configuration, ReallocateFn};

use super::Value;
use super::class::ObjClass;
use super::error::VmError;
use super::fiber::ObjFiber;
use super::object::{
    MapKey, ObjClosure, ObjFn, ObjInstance, ObjList, ObjMap, ObjRange, ObjString, ObjUpvalue,
    Object, ObjectType,
};

// =============================================================================
// GcRef
// =============================================================================

/// A reference to a heap object: an index into the heap arena.
///
/// Objects never move, so a `GcRef` stays valid until the sweep that frees
/// the object it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcRef {
    index: usize,
}

impl GcRef {
    pub(crate) fn new(index: usize) -> Self {
        Self { index }
    }

    pub fn index(self) -> usize {
        self.index
    }
}

// =============================================================================
// Heap entries
// =============================================================================

/// Header plus object.
///
/// `reservation` is the block the reallocate callback handed out for this
/// object. Its size is the object's accounted size, so the host allocator
/// sees every byte the VM counts.
struct HeapEntry {
    marked: bool,
    class: Option<GcRef>,
    size: usize,
    reservation: *mut c_void,
    object: Object,
}

/// Fixed per-object overhead counted on top of the payload.
pub const ENTRY_HEADER_SIZE: usize = size_of::<HeapEntry>();

/// Threshold for the next collection given the bytes that survived this one.
pub fn next_threshold(live_bytes: usize, min_heap_size: usize, growth_percent: usize) -> usize {
    let growth = live_bytes.saturating_mul(growth_percent) / 100;
    live_bytes.saturating_add(growth).max(min_heap_size)
}

/// Result of one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub objects_freed: usize,
}

impl CollectStats {
    pub fn bytes_freed(&self) -> usize {
        self.bytes_before - self.bytes_after
    }
}

macro_rules! typed_access {
    ($get:ident, $get_mut:ident, $try_get:ident, $variant:ident, $ty:ty) => {
        pub fn $try_get(&self, r: GcRef) -> Option<&$ty> {
            match self.get(r) {
                Object::$variant(o) => Some(o),
                _ => None,
            }
        }

        pub fn $get(&self, r: GcRef) -> &$ty {
            match self.get(r) {
                Object::$variant(o) => o,
                other => panic!(
                    concat!("expected ", stringify!($variant), " object, found {:?}"),
                    other.object_type()
                ),
            }
        }

        pub fn $get_mut(&mut self, r: GcRef) -> &mut $ty {
            match self.get_mut(r) {
                Object::$variant(o) => o,
                other => panic!(
                    concat!("expected ", stringify!($variant), " object, found {:?}"),
                    other.object_type()
                ),
            }
        }
    };
}

/// Mark-sweep heap.
///
/// Allocation never collects on its own; the VM checks [`Heap::would_exceed`]
/// first and collects with its full root set.
///
/// Object data lives in ordinary Rust collections. The block the reallocate
/// callback hands out for each entry is a reservation sized like the object:
/// it lets the host budget and refuse VM memory, but holds no VM data. Each
/// object therefore costs its size twice in process memory, once in the Rust
/// heap and once in the host allocator.
pub struct Heap {
    entries: Vec<Option<HeapEntry>>,
    free_slots: Vec<usize>,
    bytes_allocated: usize,
    next_gc: usize,
    min_heap_size: usize,
    heap_growth_percent: usize,
    reallocate: ReallocateFn,
    /// Objects held by Rust code across allocations.
    temp_roots: Vec<GcRef>,
    live_objects: usize,
}

impl Heap {
    pub fn new(config: &Configuration) -> Self {
        let config = config.resolved();
        Self {
            entries: Vec::new(),
            free_slots: Vec::new(),
            bytes_allocated: 0,
            next_gc: config.initial_heap_size,
            min_heap_size: config.min_heap_size,
            heap_growth_percent: config.heap_growth_percent,
            reallocate: config.reallocate(),
            temp_roots: Vec::new(),
            live_objects: 0,
        }
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn next_gc(&self) -> usize {
        self.next_gc
    }

    pub fn object_count(&self) -> usize {
        self.live_objects
    }

    /// Accounted size of an object, header included.
    pub fn entry_size(object: &Object) -> usize {
        ENTRY_HEADER_SIZE + object.payload_size()
    }

    /// Ask the allocator for `bytes` and release the block at once, so a
    /// buffer sized by a script is refused before Rust code builds it.
    pub fn check_capacity(&self, bytes: usize) -> Result<(), VmError> {
        if bytes == 0 {
            return Ok(());
        }
        let block = unsafe { (self.reallocate)(ptr::null_mut(), 0, bytes) };
        if block.is_null() {
            log::debug!("allocator refused a {} byte buffer", bytes);
            return Err(VmError::OutOfMemory);
        }
        unsafe { (self.reallocate)(block, bytes, 0) };
        Ok(())
    }

    /// An empty vector with room for `count` values, or `OutOfMemory` when
    /// the allocator or the Rust heap cannot supply it.
    pub fn value_buffer(&self, count: usize) -> Result<Vec<Value>, VmError> {
        let bytes = count
            .checked_mul(size_of::<Value>())
            .ok_or(VmError::OutOfMemory)?;
        self.check_capacity(bytes)?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(count)
            .map_err(|_| VmError::OutOfMemory)?;
        Ok(buffer)
    }

    /// Whether allocating `additional` bytes would cross the GC threshold.
    pub fn would_exceed(&self, additional: usize) -> bool {
        self.bytes_allocated.saturating_add(additional) > self.next_gc
    }

    /// Allocate `object` with header class `class`.
    pub fn allocate(&mut self, class: Option<GcRef>, object: Object) -> Result<GcRef, VmError> {
        let size = Self::entry_size(&object);
        let reservation = unsafe { (self.reallocate)(ptr::null_mut(), 0, size) };
        if reservation.is_null() {
            log::debug!(
                "allocator refused {} bytes for {:?}",
                size,
                object.object_type()
            );
            return Err(VmError::OutOfMemory);
        }

        let entry = HeapEntry {
            marked: false,
            class,
            size,
            reservation,
            object,
        };
        self.bytes_allocated += size;
        self.live_objects += 1;

        let index = match self.free_slots.pop() {
            Some(index) => {
                self.entries[index] = Some(entry);
                index
            }
            None => {
                self.entries.push(Some(entry));
                self.entries.len() - 1
            }
        };
        Ok(GcRef::new(index))
    }

    /// Bytes the next [`Heap::resize`] of `r` would add.
    pub fn pending_growth(&self, r: GcRef) -> usize {
        let entry = self.entry(r);
        Self::entry_size(&entry.object).saturating_sub(entry.size)
    }

    /// Re-account `r` after one of its buffers changed size.
    pub fn resize(&mut self, r: GcRef) -> Result<(), VmError> {
        let reallocate = self.reallocate;
        let entry = self.entry_mut(r);
        let new_size = Self::entry_size(&entry.object);
        let old_size = entry.size;
        if new_size == old_size {
            return Ok(());
        }

        let reservation = unsafe { reallocate(entry.reservation, old_size, new_size) };
        if reservation.is_null() {
            return Err(VmError::OutOfMemory);
        }
        entry.reservation = reservation;
        entry.size = new_size;
        self.bytes_allocated = self.bytes_allocated - old_size + new_size;
        Ok(())
    }

    fn entry(&self, r: GcRef) -> &HeapEntry {
        match self.entries.get(r.index) {
            Some(Some(entry)) => entry,
            _ => panic!("dangling object reference {}", r.index),
        }
    }

    fn entry_mut(&mut self, r: GcRef) -> &mut HeapEntry {
        match self.entries.get_mut(r.index) {
            Some(Some(entry)) => entry,
            _ => panic!("dangling object reference {}", r.index),
        }
    }

    pub fn contains(&self, r: GcRef) -> bool {
        matches!(self.entries.get(r.index), Some(Some(_)))
    }

    pub fn get(&self, r: GcRef) -> &Object {
        &self.entry(r).object
    }

    pub fn get_mut(&mut self, r: GcRef) -> &mut Object {
        &mut self.entry_mut(r).object
    }

    pub fn size_of(&self, r: GcRef) -> usize {
        self.entry(r).size
    }

    pub fn object_type(&self, r: GcRef) -> ObjectType {
        self.get(r).object_type()
    }

    /// Header class of an object.
    pub fn class_of(&self, r: GcRef) -> Option<GcRef> {
        self.entry(r).class
    }

    pub fn set_class(&mut self, r: GcRef, class: GcRef) {
        self.entry_mut(r).class = Some(class);
    }

    typed_access!(string, string_mut, try_string, String, ObjString);
    typed_access!(list, list_mut, try_list, List, ObjList);
    typed_access!(map, map_mut, try_map, Map, ObjMap);
    typed_access!(range, range_mut, try_range, Range, ObjRange);
    typed_access!(func, func_mut, try_func, Fn, ObjFn);
    typed_access!(closure, closure_mut, try_closure, Closure, ObjClosure);
    typed_access!(upvalue, upvalue_mut, try_upvalue, Upvalue, ObjUpvalue);
    typed_access!(class, class_mut, try_class, Class, ObjClass);
    typed_access!(instance, instance_mut, try_instance, Instance, ObjInstance);
    typed_access!(fiber, fiber_mut, try_fiber, Fiber, ObjFiber);

    /// Equality as scripts see it: strings by content, ranges by their
    /// bounds, everything else by identity.
    pub fn values_equal(&self, a: Value, b: Value) -> bool {
        if a.same(&b) {
            return true;
        }
        let (Value::Obj(x), Value::Obj(y)) = (a, b) else {
            return false;
        };
        match (self.get(x), self.get(y)) {
            (Object::String(s), Object::String(t)) => s.as_bytes() == t.as_bytes(),
            (Object::Range(p), Object::Range(q)) => p == q,
            _ => false,
        }
    }

    /// Hash key for `value`, or `None` if it cannot be a map key.
    pub fn map_key(&self, value: Value) -> Option<MapKey> {
        match value {
            Value::Null => Some(MapKey::Null),
            Value::Bool(b) => Some(MapKey::Bool(b)),
            Value::Num(n) => Some(MapKey::Num(MapKey::num_bits(n))),
            Value::Obj(r) => match self.get(r) {
                Object::String(s) => Some(MapKey::Str(s.as_bytes().into())),
                Object::Range(range) => Some(MapKey::Range(
                    MapKey::num_bits(range.from),
                    MapKey::num_bits(range.to),
                    range.is_inclusive,
                )),
                Object::Class(_) => Some(MapKey::Class(r)),
                _ => None,
            },
        }
    }

    // =========================================================================
    // Collection
    // =========================================================================

    pub fn push_root(&mut self, r: GcRef) {
        self.temp_roots.push(r);
    }

    pub fn pop_root(&mut self) {
        self.temp_roots.pop();
    }

    pub fn root_count(&self) -> usize {
        self.temp_roots.len()
    }

    /// Drop temporary roots pushed after the first `len`.
    pub fn truncate_roots(&mut self, len: usize) {
        self.temp_roots.truncate(len);
    }

    /// Mark phase: mark everything reachable from `roots` and the temporary
    /// roots.
    pub fn mark(&mut self, roots: &[GcRef]) {
        let mut worklist: Vec<GcRef> = roots.to_vec();
        worklist.extend_from_slice(&self.temp_roots);

        while let Some(r) = worklist.pop() {
            let Some(Some(entry)) = self.entries.get_mut(r.index) else {
                continue;
            };
            if entry.marked {
                continue;
            }
            entry.marked = true;
            worklist.extend(entry.class);
            entry.object.trace(&mut worklist);
        }
    }

    /// Sweep phase: release unmarked objects and clear surviving marks.
    /// Returns the number of objects freed.
    pub fn sweep(&mut self) -> usize {
        let reallocate = self.reallocate;
        let mut live_bytes = 0;
        let mut freed = 0;

        for (index, slot) in self.entries.iter_mut().enumerate() {
            match slot {
                Some(entry) if entry.marked => {
                    entry.marked = false;
                    live_bytes += entry.size;
                }
                Some(_) => {
                    if let Some(entry) = slot.take() {
                        unsafe {
                            reallocate(entry.reservation, entry.size, 0);
                        }
                        self.free_slots.push(index);
                        freed += 1;
                    }
                }
                None => {}
            }
        }

        self.bytes_allocated = live_bytes;
        self.live_objects -= freed;
        freed
    }

    /// Perform a full collection and move the threshold.
    pub fn collect(&mut self, roots: &[GcRef]) -> CollectStats {
        let bytes_before = self.bytes_allocated;
        self.mark(roots);
        let objects_freed = self.sweep();
        self.next_gc = next_threshold(
            self.bytes_allocated,
            self.min_heap_size,
            self.heap_growth_percent,
        );
        CollectStats {
            bytes_before,
            bytes_after: self.bytes_allocated,
            objects_freed,
        }
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        let reallocate = self.reallocate;
        for entry in self.entries.drain(..).flatten() {
            unsafe {
                reallocate(entry.reservation, entry.size, 0);
            }
        }
        self.bytes_allocated = 0;
    }
}
