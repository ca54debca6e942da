// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Physical memory primitives.

use core::fmt;

pub mod frame;

pub use frame::{AllocError, FrameAllocator, PageAllocator};

/// Size of a page in bytes.
pub const PAGE_SIZE: usize = 4096;

static_assertions::const_assert!(PAGE_SIZE.is_power_of_two());

/// Physical address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(usize);

impl PhysAddr {
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_page_aligned(self) -> bool {
        self.0 % PAGE_SIZE == 0
    }

    #[inline]
    pub const fn checked_add(self, bytes: usize) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Identity-mapped pointer to this address.
    #[inline]
    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Page-aligned half-open range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysRange {
    start: PhysAddr,
    end: PhysAddr,
}

impl PhysRange {
    /// Validates that both bounds are page aligned and ordered.
    pub const fn new(start: PhysAddr, end: PhysAddr) -> Result<Self, LayoutError> {
        if !start.is_page_aligned() {
            return Err(LayoutError::Unaligned { addr: start.raw() });
        }
        if !end.is_page_aligned() {
            return Err(LayoutError::Unaligned { addr: end.raw() });
        }
        if end.raw() < start.raw() {
            return Err(LayoutError::Inverted { start: start.raw(), end: end.raw() });
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub const fn start(&self) -> PhysAddr {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> PhysAddr {
        self.end
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end.raw() - self.start.raw()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn pages(&self) -> usize {
        self.len() / PAGE_SIZE
    }

    #[inline]
    pub const fn contains(&self, addr: PhysAddr) -> bool {
        self.start.raw() <= addr.raw() && addr.raw() < self.end.raw()
    }
}

/// Rejected memory layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// A bound that must be page aligned is not.
    Unaligned { addr: usize },
    /// `end` lies below `start`.
    Inverted { start: usize, end: usize },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unaligned { addr } => write!(f, "address {addr:#x} is not page aligned"),
            Self::Inverted { start, end } => write!(f, "range end {end:#x} below start {start:#x}"),
        }
    }
}
