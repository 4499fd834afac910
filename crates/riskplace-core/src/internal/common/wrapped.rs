use std::cell::{Ref, RefCell, RefMut};
use std::ops::Deref;
use std::rc::Rc;

/// Shared, single-threaded handle to scheduling state.
///
/// Every borrow obtained through [`WrappedRcRefCell::get_mut`] must be dropped
/// before the holder suspends, otherwise another local task touching the same
/// state panics.
#[derive(Default, Debug)]
pub struct WrappedRcRefCell<T: ?Sized> {
    inner: Rc<RefCell<T>>,
}

impl<T> WrappedRcRefCell<T> {
    #[inline]
    pub fn wrap(t: T) -> Self {
        WrappedRcRefCell {
            inner: Rc::new(RefCell::new(t)),
        }
    }
}

impl<T: ?Sized> WrappedRcRefCell<T> {
    #[inline]
    #[track_caller]
    pub fn get(&self) -> Ref<'_, T> {
        self.inner.deref().borrow()
    }

    #[inline]
    #[track_caller]
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.inner.deref().borrow_mut()
    }
}

impl<T: ?Sized> Clone for WrappedRcRefCell<T> {
    #[inline]
    fn clone(&self) -> Self {
        WrappedRcRefCell {
            inner: self.inner.clone(),
        }
    }
}
