//! CPU and memory state.
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    constants::*,
    devices::{KeyCode, KeyState},
    error::{Chip8Error, Chip8Result},
};

/// Core state for a chip8 interpreter.
///
/// A freshly constructed CPU is already [reset](Chip8Cpu::reset), with the
/// font loaded and the program counter at [`MEM_START`].
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: usize,
    /// Stack pointer, indicating the next free slot on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register (I) used for temporarily storing an address.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Register waiting for a keypress, set by `Fx0A`.
    pub(crate) key_wait: Option<usize>,
    /// Keyboard input state.
    pub(crate) keys: KeyState,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn to. Each pixel is either 0 or 1.
    pub(crate) display: Box<[u8; DISPLAY_BUFFER_SIZE]>,
    /// Display buffer changed since the presentation layer last consumed it.
    pub(crate) draw_flag: bool,

    /// Source for `Cxnn`.
    pub(crate) rng: StdRng,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a CPU with a deterministic random number sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut cpu = Self {
            pc: 0,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_wait: None,
            keys: [false; KEY_COUNT],

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Box::new([0; DISPLAY_BUFFER_SIZE]),
            draw_flag: false,

            rng,
        };
        cpu.reset();
        cpu
    }

    /// Return the machine to its power-on state.
    ///
    /// Erases memory, stack, registers, timers, keys and display,
    /// loads the built-in font and points the program counter at [`MEM_START`].
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.stack.fill(0);
        self.display.fill(0);
        self.registers.fill(0);
        self.keys.fill(false);

        self.pc = MEM_START;
        self.sp = 0;
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_wait = None;
        self.draw_flag = false;

        self.ram[FONTSET_START..FONTSET_START + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);

        log::debug!("cpu reset");
    }

    /// Copy program bytes into memory at [`MEM_START`].
    ///
    /// Programs larger than [`MAX_PROGRAM_SIZE`] are rejected and memory is left untouched.
    pub fn load_program(&mut self, program: &[u8]) -> Chip8Result<()> {
        check_program_size(program)?;

        self.ram[MEM_START..MEM_START + program.len()].copy_from_slice(program);
        log::debug!("loaded program of {} bytes", program.len());

        Ok(())
    }

    /// Count down both timers by one step.
    ///
    /// Must be driven at [`DELAY_FREQUENCY`], independent of the instruction rate.
    /// Returns `true` when the sound timer expires on this tick, meaning a tone
    /// should be emitted.
    pub fn tick_timers(&mut self) -> bool {
        let beep = self.sound_timer == 1;
        self.tick_delay();
        self.tick_sound();
        beep
    }

    /// Count down the delay timer.
    #[inline]
    fn tick_delay(&mut self) {
        // The checked_sub implementation uses `unlikely!()` which degrades performance.
        let (val, underflow) = self.delay_timer.overflowing_sub(1);
        if !underflow {
            self.delay_timer = val;
        }
    }

    #[inline]
    fn tick_sound(&mut self) {
        let (val, underflow) = self.sound_timer.overflowing_sub(1);
        if !underflow {
            self.sound_timer = val;
        }
    }
}

/// Reject programs that don't fit between [`MEM_START`] and the end of memory.
pub(crate) fn check_program_size(program: &[u8]) -> Chip8Result<()> {
    if program.len() > MAX_PROGRAM_SIZE {
        return Err(Chip8Error::ProgramTooLarge {
            size: program.len(),
            capacity: MAX_PROGRAM_SIZE,
        });
    }
    Ok(())
}

/// Keyboard
impl Chip8Cpu {
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.keys[key.index()] = pressed;
    }

    /// Replace the whole keyboard state.
    pub fn set_keys(&mut self, keys: KeyState) {
        self.keys = keys;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys[key.index()]
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.keys.fill(false);
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.keys.iter().any(|pressed| *pressed)
    }

    /// Retrieve the highest key that is pressed down.
    #[inline]
    pub fn last_key(&self) -> Option<u8> {
        self.keys.iter().rposition(|pressed| *pressed).map(|k| k as u8)
    }

    /// Machine is stalled on `Fx0A`.
    pub fn is_waiting_for_key(&self) -> bool {
        self.key_wait.is_some()
    }
}

/// Display
impl Chip8Cpu {
    pub fn display(&self) -> &[u8; DISPLAY_BUFFER_SIZE] {
        &self.display
    }

    /// Pixel at column `x` and row `y`, wrapped to the display size.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.display[(x % DISPLAY_WIDTH) + (y % DISPLAY_HEIGHT) * DISPLAY_WIDTH] != 0
    }

    pub fn clear_display(&mut self) {
        self.display.fill(0);
        self.draw_flag = true;
    }

    pub fn draw_flag(&self) -> bool {
        self.draw_flag
    }

    /// Consume the draw flag, returning whether a repaint is needed.
    pub fn take_draw_flag(&mut self) -> bool {
        std::mem::take(&mut self.draw_flag)
    }
}

/// Inspection
impl Chip8Cpu {
    pub fn pc(&self) -> Address {
        self.pc as Address
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Index register I.
    pub fn index(&self) -> Address {
        self.address
    }

    pub fn register(&self, n: usize) -> u8 {
        self.registers[n & 0xF]
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.ram
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// Buzzer should be on while the sound timer counts down.
    pub fn is_sound_active(&self) -> bool {
        self.sound_timer > 0
    }
}
