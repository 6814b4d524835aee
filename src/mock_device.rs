//! Mock FTDI driver used by unit tests to emulate a relay board.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ftdi::BitBangDevice;
use crate::ftdi::DeviceInfo;
use crate::ftdi::Driver;
use crate::ftdi::DriverError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    List,
    Open(String),
    SetBaudRate(u32),
    SetBitBang(u8),
    Read,
    Write(u8),
    Close,
}

#[derive(Default)]
pub struct MockState {
    pub devices: Vec<DeviceInfo>,
    pub calls: Vec<Call>,
    /// Byte currently latched on the data lines.
    pub pins: u8,
    pub open_error: Option<DriverError>,
    pub read_error: Option<DriverError>,
    /// Fails the write with this zero-based number.
    pub failing_write: Option<(usize, DriverError)>,
    pub short_write: bool,
    pub close_error: Option<DriverError>,
    writes: usize,
}

impl MockState {
    pub fn writes(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Write(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    pub fn device_io(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| !matches!(c, Call::List))
            .count()
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    pub state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    pub fn with_devices(serials: &[&str]) -> MockDriver {
        let driver = MockDriver::default();
        driver.state.borrow_mut().devices = serials
            .iter()
            .enumerate()
            .map(|(index, serial)| DeviceInfo {
                index,
                description: String::from("FT245R USB FIFO"),
                serial: serial.to_string(),
            })
            .collect();
        driver
    }

    pub fn set_pins(&self, pins: u8) {
        self.state.borrow_mut().pins = pins;
    }

    pub fn pins(&self) -> u8 {
        self.state.borrow().pins
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn writes(&self) -> Vec<u8> {
        self.state.borrow().writes()
    }

    pub fn device_io(&self) -> usize {
        self.state.borrow().device_io()
    }
}

impl Driver for MockDriver {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, DriverError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::List);
        Ok(state.devices.clone())
    }

    fn open(&self, serial: &str) -> Result<Box<dyn BitBangDevice>, DriverError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Open(serial.to_string()));
        if let Some(e) = state.open_error.clone() {
            return Err(e);
        }
        if !state.devices.iter().any(|d| d.serial == serial) {
            return Err(DriverError::DeviceNotFound);
        }
        Ok(Box::new(MockDevice {
            state: self.state.clone(),
        }))
    }
}

pub struct MockDevice {
    state: Rc<RefCell<MockState>>,
}

impl BitBangDevice for MockDevice {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), DriverError> {
        self.state.borrow_mut().calls.push(Call::SetBaudRate(baud_rate));
        Ok(())
    }

    fn set_async_bitbang(&mut self, output_mask: u8) -> Result<(), DriverError> {
        self.state.borrow_mut().calls.push(Call::SetBitBang(output_mask));
        Ok(())
    }

    fn read_pins(&mut self) -> Result<u8, DriverError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Read);
        match state.read_error.clone() {
            Some(e) => Err(e),
            None => Ok(state.pins),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, DriverError> {
        let mut state = self.state.borrow_mut();
        let n = state.writes;
        state.writes += 1;
        if let Some((failing, e)) = state.failing_write.clone() {
            if failing == n {
                return Err(e);
            }
        }
        if state.short_write {
            return Ok(0);
        }
        for &byte in data {
            state.calls.push(Call::Write(byte));
            state.pins = byte;
        }
        Ok(data.len())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Close);
        match state.close_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
