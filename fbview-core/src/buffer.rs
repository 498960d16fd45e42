//! Shared pixel memory.
//!
//! The active render engine owns the pixel memory through a
//! [`SharedBuffer`]; the [`PixelSurface`](crate::surface::PixelSurface)
//! only keeps a [`BufferView`]. When an engine frees the OS object that
//! backs the memory it first calls [`PixelBuffer::revoke`], so a view
//! that outlives its engine sees an empty buffer instead of freed memory.
//!
//! `Rc`/`Weak` make every holder `!Send`: the frame buffer is driven
//! from a single thread.

use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::{Rc, Weak};

use crate::error::{RenderError, Result};

/// Strong handle held by the owning engine.
pub type SharedBuffer = Rc<PixelBuffer>;

/// Non-owning handle held by surfaces.
pub type BufferView = Weak<PixelBuffer>;

enum Storage {
    /// Heap memory owned by the buffer itself.
    Owned(Vec<u8>),
    /// Memory owned by an OS object (e.g. DIB section bits).
    Mapped { ptr: NonNull<u8>, len: usize },
    /// The backing memory has been released.
    Revoked,
}

/// A block of pixel memory with scoped, borrow-checked access.
pub struct PixelBuffer {
    storage: RefCell<Storage>,
}

impl PixelBuffer {
    /// Allocate `len` zeroed bytes on the heap.
    pub fn owned(len: usize) -> SharedBuffer {
        Rc::new(Self {
            storage: RefCell::new(Storage::Owned(vec![0; len])),
        })
    }

    /// Wrap memory owned by someone else.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes until
    /// [`revoke`](Self::revoke) is called, and nothing else may access
    /// that memory through Rust references in the meantime.
    pub unsafe fn mapped(ptr: NonNull<u8>, len: usize) -> SharedBuffer {
        Rc::new(Self {
            storage: RefCell::new(Storage::Mapped { ptr, len }),
        })
    }

    /// Size in bytes, zero once revoked.
    pub fn len(&self) -> usize {
        match &*self.storage.borrow() {
            Storage::Owned(v) => v.len(),
            Storage::Mapped { len, .. } => *len,
            Storage::Revoked => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_revoked(&self) -> bool {
        matches!(&*self.storage.borrow(), Storage::Revoked)
    }

    /// Detach the buffer from its memory. Idempotent.
    ///
    /// Must be called by the owner before the backing memory is freed.
    pub fn revoke(&self) {
        *self.storage.borrow_mut() = Storage::Revoked;
    }

    /// Address of the first byte, null once revoked.
    pub fn as_ptr(&self) -> *const u8 {
        match &*self.storage.borrow() {
            Storage::Owned(v) => v.as_ptr(),
            Storage::Mapped { ptr, .. } => ptr.as_ptr(),
            Storage::Revoked => std::ptr::null(),
        }
    }

    /// Run `f` over the bytes.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let storage = self.storage.try_borrow().map_err(|_| RenderError::BufferBusy)?;
        match &*storage {
            Storage::Owned(v) => Ok(f(v)),
            // SAFETY: validity is guaranteed by the `mapped` contract until revoked.
            Storage::Mapped { ptr, len } => {
                Ok(f(unsafe { std::slice::from_raw_parts(ptr.as_ptr(), *len) }))
            }
            Storage::Revoked => Err(RenderError::Uninitialized("pixel buffer was released")),
        }
    }

    /// Run `f` over the bytes mutably.
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let mut storage = self
            .storage
            .try_borrow_mut()
            .map_err(|_| RenderError::BufferBusy)?;
        match &mut *storage {
            Storage::Owned(v) => Ok(f(v)),
            // SAFETY: validity is guaranteed by the `mapped` contract until revoked;
            // the RefCell borrow makes this the only live reference.
            Storage::Mapped { ptr, len } => {
                Ok(f(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), *len) }))
            }
            Storage::Revoked => Err(RenderError::Uninitialized("pixel buffer was released")),
        }
    }

    /// Copy of the current contents, `None` once revoked.
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.with_bytes(|b| b.to_vec()).ok()
    }

    /// Overwrite the start of the buffer with `data`, truncating to
    /// whichever side is shorter. Returns the number of bytes copied.
    pub fn restore(&self, data: &[u8]) -> Result<usize> {
        self.with_bytes_mut(|b| {
            let n = b.len().min(data.len());
            b[..n].copy_from_slice(&data[..n]);
            n
        })
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_buffer_is_zeroed() {
        let buf = PixelBuffer::owned(16);
        assert_eq!(buf.len(), 16);
        assert!(buf.with_bytes(|b| b.iter().all(|&x| x == 0)).unwrap());
    }

    #[test]
    fn revoke_blocks_access() {
        let buf = PixelBuffer::owned(8);
        buf.revoke();
        buf.revoke();
        assert!(buf.is_revoked());
        assert!(buf.as_ptr().is_null());
        assert!(matches!(
            buf.with_bytes_mut(|b| b[0] = 1),
            Err(RenderError::Uninitialized(_))
        ));
        assert!(buf.snapshot().is_none());
    }

    #[test]
    fn nested_mutable_access_is_busy() {
        let buf = PixelBuffer::owned(4);
        let inner = buf
            .with_bytes_mut(|_| buf.with_bytes(|_| ()))
            .unwrap();
        assert_eq!(inner, Err(RenderError::BufferBusy));
    }

    #[test]
    fn mapped_buffer_writes_through() {
        let mut backing = vec![0u8; 4];
        let ptr = NonNull::new(backing.as_mut_ptr()).unwrap();
        let buf = unsafe { PixelBuffer::mapped(ptr, backing.len()) };
        buf.with_bytes_mut(|b| b.copy_from_slice(&[1, 2, 3, 4])).unwrap();
        buf.revoke();
        assert_eq!(backing, [1, 2, 3, 4]);
    }

    #[test]
    fn restore_truncates() {
        let buf = PixelBuffer::owned(3);
        assert_eq!(buf.restore(&[9, 9, 9, 9, 9]).unwrap(), 3);
        assert_eq!(buf.snapshot().unwrap(), vec![9, 9, 9]);

        let big = PixelBuffer::owned(6);
        assert_eq!(big.restore(&[7, 7]).unwrap(), 2);
        assert_eq!(big.snapshot().unwrap(), vec![7, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn weak_view_does_not_keep_buffer_alive() {
        let buf = PixelBuffer::owned(4);
        let view: BufferView = Rc::downgrade(&buf);
        drop(buf);
        assert!(view.upgrade().is_none());
    }
}
