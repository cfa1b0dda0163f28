mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod devices;
mod error;
mod interp;
mod vm;

pub use self::{
    devices::{Devices, InvalidKeyCode, KeyCode, KeyState},
    error::{Chip8Error, Chip8Result},
    vm::Hz,
};

/// Version of this crate, for display in hosts.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::Chip8Cpu,
        devices::{Devices, KeyCode, KeyState},
        error::{Chip8Error, Chip8Result},
        interp::Flow,
        vm::{Chip8Conf, Chip8Vm, Hz},
    };
}
