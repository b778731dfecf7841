//! Device collaborators: USB bring-up and raw HID reads.
//!
//! The controller powers up in a mode that sends no HID reports. Two vendor commands on the
//! USB bulk endpoint switch it into report mode and set the player LED; after that the
//! regular HID interface streams 64-byte input reports.
//!
//! Both halves sit behind small traits so the session can be driven by scripted fakes in
//! tests. The production implementations use `rusb` and `hidapi`.

use crate::config::DeviceIds;
use hidapi::{HidApi, HidDevice};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Puts the controller into its default report mode.
pub const DEFAULT_REPORT_DATA: [u8; 16] = [
    0x03, 0x91, 0x00, 0x0d, 0x00, 0x08, 0x00, 0x00, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF,
];

/// Sets the player LED.
pub const SET_LED_DATA: [u8; 16] = [
    0x09, 0x91, 0x00, 0x07, 0x00, 0x08, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

pub const BRING_UP_INTERFACE: u8 = 1;
pub const BRING_UP_ENDPOINT: u8 = 0x02;
pub const BRING_UP_WRITE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Largest report the read loop asks for.
pub const REPORT_BUFFER_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsbError {
    #[error("USB resource busy: {0}")]
    Busy(String),

    #[error("USB transfer failed: {0}")]
    Transfer(String),

    #[error("USB error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HidError {
    #[error("Failed to open HID device: {0}")]
    Open(String),

    #[error("HID read failed: {0}")]
    Read(String),

    #[error("HID close failed: {0}")]
    Close(String),
}

/// USB side of the bring-up handshake.
pub trait UsbBus: Send {
    fn find(&self, ids: DeviceIds) -> Option<Box<dyn UsbLink>>;
}

/// An opened USB device used only for the bring-up commands.
pub trait UsbLink {
    fn set_configuration(&mut self) -> Result<(), UsbError>;
    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError>;
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize, UsbError>;
    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError>;
}

/// HID side: opens the report stream.
pub trait HidTransport: Send {
    fn open(&self, ids: DeviceIds) -> Result<Box<dyn ReportSource>, HidError>;
}

/// An open HID handle owned by the read loop.
pub trait ReportSource: Send {
    /// Reads one report into `buf`. `Ok(0)` means the timeout elapsed without data.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, HidError>;

    fn close(&mut self) -> Result<(), HidError>;
}

/// Outcome of the bring-up sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BringUpError {
    NotFound,
    WriteFailed(UsbError),
}

/// Runs the vendor handshake: configure, claim, two command writes, release.
///
/// Configuration, claim and release failures usually mean the device is already in that
/// state and are only logged. A failed command write aborts the handshake.
pub fn bring_up(bus: &dyn UsbBus, ids: DeviceIds) -> Result<(), BringUpError> {
    let mut link = bus.find(ids).ok_or(BringUpError::NotFound)?;
    info!(
        "Found USB device {:04x}:{:04x}",
        ids.vendor_id, ids.product_id
    );

    if let Err(e) = link.set_configuration() {
        debug!("set_configuration skipped: {}", e);
    }
    if let Err(e) = link.claim_interface(BRING_UP_INTERFACE) {
        debug!("claim_interface skipped: {}", e);
    }

    let result = send_init_commands(link.as_mut());

    if let Err(e) = link.release_interface(BRING_UP_INTERFACE) {
        debug!("release_interface skipped: {}", e);
    }

    result
}

fn send_init_commands(link: &mut dyn UsbLink) -> Result<(), BringUpError> {
    for (name, payload) in [
        ("default report mode", &DEFAULT_REPORT_DATA),
        ("set LED", &SET_LED_DATA),
    ] {
        debug!("Sending {} command", name);
        let written = link
            .write(BRING_UP_ENDPOINT, payload, BRING_UP_WRITE_TIMEOUT)
            .map_err(BringUpError::WriteFailed)?;
        if written != payload.len() {
            warn!(
                "Short write for {} command: {}/{} bytes",
                name,
                written,
                payload.len()
            );
        }
    }
    Ok(())
}

/// `rusb` backed bring-up.
pub struct RusbBus;

impl UsbBus for RusbBus {
    fn find(&self, ids: DeviceIds) -> Option<Box<dyn UsbLink>> {
        let mut handle = rusb::open_device_with_vid_pid(ids.vendor_id, ids.product_id)?;
        // Linux binds a kernel driver to the interface; let libusb swap it out for the claim.
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!("Kernel driver auto-detach unavailable: {}", e);
        }
        Some(Box::new(RusbLink { handle }))
    }
}

struct RusbLink {
    handle: rusb::DeviceHandle<rusb::GlobalContext>,
}

impl UsbLink for RusbLink {
    fn set_configuration(&mut self) -> Result<(), UsbError> {
        self.handle.set_active_configuration(1).map_err(usb_error)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.handle.claim_interface(interface).map_err(usb_error)
    }

    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize, UsbError> {
        self.handle
            .write_bulk(endpoint, data, timeout)
            .map_err(usb_error)
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.handle.release_interface(interface).map_err(usb_error)
    }
}

fn usb_error(e: rusb::Error) -> UsbError {
    match e {
        rusb::Error::Busy => UsbError::Busy(e.to_string()),
        rusb::Error::Timeout | rusb::Error::Pipe | rusb::Error::Io => {
            UsbError::Transfer(e.to_string())
        }
        other => UsbError::Other(other.to_string()),
    }
}

/// `hidapi` backed report stream.
pub struct HidapiTransport;

impl HidTransport for HidapiTransport {
    fn open(&self, ids: DeviceIds) -> Result<Box<dyn ReportSource>, HidError> {
        let api = HidApi::new().map_err(|e| HidError::Open(e.to_string()))?;
        let device = api
            .open(ids.vendor_id, ids.product_id)
            .map_err(|e| HidError::Open(e.to_string()))?;

        match device.get_product_string() {
            Ok(Some(name)) => info!("Opened HID device: {}", name),
            _ => info!(
                "Opened HID device {:04x}:{:04x}",
                ids.vendor_id, ids.product_id
            ),
        }

        Ok(Box::new(HidapiSource {
            device: Some(device),
        }))
    }
}

struct HidapiSource {
    device: Option<HidDevice>,
}

impl ReportSource for HidapiSource {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, HidError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| HidError::Read("device already closed".to_string()))?;
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        device
            .read_timeout(buf, timeout_ms)
            .map_err(|e| HidError::Read(e.to_string()))
    }

    fn close(&mut self) -> Result<(), HidError> {
        // hidapi closes the handle on drop
        match self.device.take() {
            Some(device) => {
                drop(device);
                Ok(())
            }
            None => Err(HidError::Close("device already closed".to_string())),
        }
    }
}
