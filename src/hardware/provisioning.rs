// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The provisioning list and its persistent store.
//!
//! The Coordinator keeps the ids of every Component it is willing to boot in
//! a [`ProvisioningList`]. The list lives in a [`Store`]; [`FlashStore`]
//! keeps it in a [`Flash`] device as a fixed-size little-endian record:
//! ```text
//! magic  u32   0xdeadbeef once initialized
//! count  u32
//! ids    [u32; 32]
//! ```
//!
//! [`Flash`]: ../flash/trait.Flash.html

use byteorder::ByteOrder as _;
use byteorder::LE;
use static_assertions::assert_obj_safe;
use zerocopy::AsBytes;
use zerocopy::FromBytes;
use zerocopy::LayoutVerified;
use zerocopy::Unaligned;

use arrayvec::ArrayVec;

use crate::hardware::flash;
use crate::hardware::flash::Flash;
use crate::protocol::DeviceId;

/// The most Components a list may hold.
pub const MAX_PROVISIONED: usize = 32;

/// The marker distinguishing an initialized store from blank storage.
pub const MAGIC: u32 = 0xdeadbeef;

/// A provisioning error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that an id is already on the list.
    Duplicate(DeviceId),
    /// Indicates that the list has no room left.
    ListFull,
    /// Indicates that an id is not on the list.
    NotProvisioned(DeviceId),
    /// Indicates that the stored record is corrupt.
    Corrupt,
    /// Indicates that the underlying storage failed.
    Flash(flash::Error),
}

impl From<flash::Error> for Error {
    fn from(e: flash::Error) -> Self {
        Self::Flash(e)
    }
}

/// An ordered, duplicate-free list of authorized Component ids.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ProvisioningList {
    ids: ArrayVec<DeviceId, MAX_PROVISIONED>,
}

impl ProvisioningList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from `ids`, in order.
    pub fn from_ids(ids: &[DeviceId]) -> Result<Self, Error> {
        let mut list = Self::new();
        for &id in ids {
            list.push(id)?;
        }
        Ok(list)
    }

    /// Appends `id` to the list.
    pub fn push(&mut self, id: DeviceId) -> Result<(), Error> {
        check!(!self.contains(id), Error::Duplicate(id));
        self.ids.try_push(id).map_err(|_| failed!(Error::ListFull))
    }

    /// Returns `true` if `id` is on the list.
    pub fn contains(&self, id: DeviceId) -> bool {
        self.ids.contains(&id)
    }

    /// Replaces `old` with `new`, keeping its position.
    ///
    /// The list is untouched on failure.
    pub fn replace(&mut self, old: DeviceId, new: DeviceId) -> Result<(), Error> {
        let pos = self
            .ids
            .iter()
            .position(|&id| id == old)
            .ok_or_else(|| failed!(Error::NotProvisioned(old)))?;
        check!(old == new || !self.contains(new), Error::Duplicate(new));
        self.ids[pos] = new;
        Ok(())
    }

    /// Returns the ids on the list, in order.
    pub fn ids(&self) -> &[DeviceId] {
        &self.ids
    }

    /// Returns the number of ids on the list.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Persistent storage for a [`ProvisioningList`].
pub trait Store {
    /// Loads the stored list.
    ///
    /// Returns `None` if the store has never been initialized.
    fn load(&mut self) -> Result<Option<ProvisioningList>, Error>;

    /// Persists `list`, marking the store initialized.
    fn save(&mut self, list: &ProvisioningList) -> Result<(), Error>;
}
assert_obj_safe!(Store);

/// Loads the list in `store`, seeding it with `defaults` if the store is
/// blank.
pub fn load_or_seed(
    store: &mut dyn Store,
    defaults: &[DeviceId],
) -> Result<ProvisioningList, Error> {
    if let Some(list) = store.load()? {
        return Ok(list);
    }

    info!("provisioning store is blank; seeding {} ids", defaults.len());
    let list = ProvisioningList::from_ids(defaults)?;
    store.save(&list)?;
    Ok(list)
}

#[derive(FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct Record {
    magic: [u8; 4],
    count: [u8; 4],
    ids: [[u8; 4]; MAX_PROVISIONED],
}

/// The size, in bytes, of a persisted provisioning record.
pub const RECORD_LEN: usize = 4 + 4 + 4 * MAX_PROVISIONED;

/// A [`Store`] kept at the start of a [`Flash`] device.
///
/// [`Flash`]: ../flash/trait.Flash.html
pub struct FlashStore<F> {
    flash: F,
}

impl<F: Flash> FlashStore<F> {
    /// Creates a new store on `flash`.
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Returns a reference to the underlying device.
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Returns the underlying device.
    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: Flash> Store for FlashStore<F> {
    fn load(&mut self) -> Result<Option<ProvisioningList>, Error> {
        let mut buf = [0; RECORD_LEN];
        self.flash.read(0, &mut buf)?;
        let record = LayoutVerified::<_, Record>::new_unaligned(&buf[..])
            .ok_or_else(|| failed!(Error::Corrupt))?;

        if LE::read_u32(&record.magic) != MAGIC {
            return Ok(None);
        }
        let count = LE::read_u32(&record.count) as usize;
        check!(count <= MAX_PROVISIONED, Error::Corrupt);

        let mut list = ProvisioningList::new();
        for id in &record.ids[..count] {
            list.push(DeviceId(LE::read_u32(id)))
                .map_err(|_| failed!(Error::Corrupt))?;
        }
        Ok(Some(list))
    }

    fn save(&mut self, list: &ProvisioningList) -> Result<(), Error> {
        let mut record = Record {
            magic: [0; 4],
            count: [0; 4],
            ids: [[0; 4]; MAX_PROVISIONED],
        };
        LE::write_u32(&mut record.magic, MAGIC);
        LE::write_u32(&mut record.count, list.len() as u32);
        for (slot, id) in record.ids.iter_mut().zip(list.ids()) {
            LE::write_u32(slot, id.0);
        }

        self.flash.program(0, record.as_bytes())?;
        self.flash.flush()?;
        Ok(())
    }
}
