//! Lock wrappers - use parking_lot if available, std otherwise.
//!
//! Poisoning is ignored on the std path: a panic inside a strategy is a
//! fatal contract violation, and the allocator is not expected to recover.

#[cfg(feature = "parking_lot")]
pub use parking_lot::{Mutex, RwLock};

#[cfg(not(feature = "parking_lot"))]
mod std_locks {
    use std::sync::{
        Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError, RwLock as StdRwLock,
        RwLockReadGuard as StdReadGuard, RwLockWriteGuard as StdWriteGuard,
    };

    /// Thin wrapper around std::sync::Mutex.
    pub struct Mutex<T>(StdMutex<T>);

    impl<T> Mutex<T> {
        /// Create a new mutex.
        pub const fn new(value: T) -> Self {
            Self(StdMutex::new(value))
        }

        /// Lock the mutex.
        pub fn lock(&self) -> MutexGuard<'_, T> {
            MutexGuard(self.0.lock().unwrap_or_else(PoisonError::into_inner))
        }

        /// Get mutable access without locking.
        pub fn get_mut(&mut self) -> &mut T {
            self.0.get_mut().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Guard for std mutex.
    pub struct MutexGuard<'a, T>(StdMutexGuard<'a, T>);

    impl<'a, T> std::ops::Deref for MutexGuard<'a, T> {
        type Target = T;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl<'a, T> std::ops::DerefMut for MutexGuard<'a, T> {
        fn deref_mut(&mut self) -> &mut Self::Target {
            &mut self.0
        }
    }

    /// Thin wrapper around std::sync::RwLock.
    pub struct RwLock<T>(StdRwLock<T>);

    impl<T> RwLock<T> {
        /// Create a new reader-writer lock.
        pub const fn new(value: T) -> Self {
            Self(StdRwLock::new(value))
        }

        /// Acquire shared access.
        pub fn read(&self) -> RwLockReadGuard<'_, T> {
            RwLockReadGuard(self.0.read().unwrap_or_else(PoisonError::into_inner))
        }

        /// Acquire exclusive access.
        pub fn write(&self) -> RwLockWriteGuard<'_, T> {
            RwLockWriteGuard(self.0.write().unwrap_or_else(PoisonError::into_inner))
        }
    }

    /// Shared guard for std rwlock.
    pub struct RwLockReadGuard<'a, T>(StdReadGuard<'a, T>);

    impl<'a, T> std::ops::Deref for RwLockReadGuard<'a, T> {
        type Target = T;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    /// Exclusive guard for std rwlock.
    pub struct RwLockWriteGuard<'a, T>(StdWriteGuard<'a, T>);

    impl<'a, T> std::ops::Deref for RwLockWriteGuard<'a, T> {
        type Target = T;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl<'a, T> std::ops::DerefMut for RwLockWriteGuard<'a, T> {
        fn deref_mut(&mut self) -> &mut Self::Target {
            &mut self.0
        }
    }
}

#[cfg(not(feature = "parking_lot"))]
pub use std_locks::{Mutex, RwLock};
