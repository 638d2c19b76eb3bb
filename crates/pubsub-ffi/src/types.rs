use std::ffi::c_void;

use pubsub_endpoint::{GET_TYPE, SET_TYPE, TYPE_NONE, TYPE_PUB, TYPE_SUB};

pub const PS_TYPE_NONE: u64 = TYPE_NONE;
pub const PS_TYPE_PUB: u64 = TYPE_PUB;
pub const PS_TYPE_SUB: u64 = TYPE_SUB;

pub const PS_SET_TYPE: u32 = SET_TYPE;
pub const PS_GET_TYPE: u32 = GET_TYPE;

pub const PS_MAX_WRITE_SIZE: usize = pubsub_endpoint::DEFAULT_MAX_WRITE_SIZE;

pub type PsDeviceHandle = *mut c_void;
