//! Single-occupancy slot serializing async operations on one value
//!
//! The browser hands out `'static` futures, so the annotator cannot be
//! borrowed across an await from JavaScript. Instead an operation takes the
//! value out of the slot and puts it back when its guard drops. While it is
//! out, every other caller gets [`AnnotError::Busy`].

use crate::error::AnnotError;
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

pub struct EditorSlot<T> {
    inner: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for EditorSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> EditorSlot<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(value))),
        }
    }

    /// Take the value for the duration of an operation.
    pub fn acquire(&self) -> Result<SlotGuard<T>, AnnotError> {
        let value = self.inner.borrow_mut().take().ok_or(AnnotError::Busy)?;
        Ok(SlotGuard {
            slot: Rc::clone(&self.inner),
            value: Some(value),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.inner.borrow().is_none()
    }
}

/// Holds the slot's value; returns it on drop.
pub struct SlotGuard<T> {
    slot: Rc<RefCell<Option<T>>>,
    value: Option<T>,
}

impl<T> Deref for SlotGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => unreachable!("slot guard is only emptied on drop"),
        }
    }
}

impl<T> DerefMut for SlotGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("slot guard is only emptied on drop"),
        }
    }
}

impl<T> Drop for SlotGuard<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            *self.slot.borrow_mut() = Some(value);
        }
    }
}
