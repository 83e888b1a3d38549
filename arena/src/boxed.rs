// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! An owning pointer into an [`Arena`].
//!
//! Unlike a plain [`Arena::alloc`] reference, a [`Box`] runs the value's
//! destructor when it goes out of scope, which makes it suitable for
//! recursive structures that own resources:
//!
//! ```rust
//! use qrlink_arena::{boxed::Box, Arena};
//!
//! enum Expr<'a> {
//!     Leaf(u8),
//!     Not(Box<'a, Expr<'a>>),
//! }
//!
//! let arena: Arena<Expr, 4> = Arena::new();
//! let inner = Box::new_in(Expr::Leaf(1), &arena).ok().unwrap();
//! let expr = Expr::Not(inner);
//! # let _ = expr;
//! ```

use core::{fmt, ops::Deref, ptr};

use crate::Arena;

/// An arena-backed box.
pub struct Box<'a, T>(&'a mut T);

impl<'a, T> Box<'a, T> {
    /// Allocate `value` in `arena`, returning the value itself when the
    /// arena is full.
    pub fn new_in<const N: usize>(value: T, arena: &'a Arena<T, N>) -> Result<Self, T> {
        arena.alloc(value).map(Self)
    }
}

impl<'a, T> Deref for Box<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for Box<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

impl<'a, 'b, T: PartialEq> PartialEq<Box<'b, T>> for Box<'a, T> {
    fn eq(&self, other: &Box<'b, T>) -> bool {
        PartialEq::eq(&**self, &**other)
    }
}

impl<'a, T> Drop for Box<'a, T> {
    fn drop(&mut self) {
        // The arena never touches the slot again, so dropping in place is
        // the only destructor run for this value.
        unsafe { ptr::drop_in_place(self.0) }
    }
}
