//! Airlift BLE Transfer Protocol
//!
//! This crate defines the byte layouts exchanged between an update client
//! (phone, laptop) and a device running the Airlift update service. Layouts
//! are fixed; clients interoperate by position, not by schema negotiation,
//! so existing field orders and command values never change.
//!
//! # Protocol Overview
//!
//! The service exposes three characteristics:
//! ```text
//! ┌──────────┬──────────────┬──────────────────────────────────────────┐
//! │ DATA     │ write        │ init packet, then raw firmware chunks    │
//! │ CONTROL  │ write/notify │ 1-byte commands in, 1-byte ACKs out      │
//! │ PROGRESS │ read/notify  │ 15-byte progress packet                  │
//! └──────────┴──────────────┴──────────────────────────────────────────┘
//! ```
//!
//! Init packet (9 bytes, little-endian):
//! ```text
//! ┌───────────────┬──────────────┬───────┐
//! │ FIRMWARE_SIZE │ FIRMWARE_CRC │ FLAGS │
//! │ u32           │ u32          │ u8    │
//! └───────────────┴──────────────┴───────┘
//! ```

//!
//! [`Uploader`] implements the client side of the exchange without any I/O,
//! so host tools and tests can drive a device from the same definitions.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod control;
pub mod gatt;
pub mod packet;
pub mod upload;

pub use control::{ControlCommand, ACK_VALUE};
pub use packet::{
    InitPacket, PacketError, ProgressPacket, INIT_PACKET_SIZE, PROGRESS_PACKET_SIZE,
};
pub use upload::{Outcome, TransferStats, UploadError, Uploader};
