//! The `platform` module contains the platform-specific implementations of the [`api`]
//! traits. Only BlueZ (Linux) is provided.

pub use crate::bluez::{adapter::Adapter, peripheral::Peripheral};

use crate::api::{self, Transport};
use static_assertions::assert_impl_all;
use std::fmt::Debug;

// Ensure that the exported types implement all the expected traits.
assert_impl_all!(Adapter: Transport, Clone, Debug, Send, Sized, Sync);
assert_impl_all!(Peripheral: api::Peripheral, Clone, Debug, Send, Sized, Sync);
