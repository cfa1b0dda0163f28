//! Virtual machine driver.
use std::time::Duration;

use crate::{
    clock::Clock,
    constants::*,
    cpu::{check_program_size, Chip8Cpu},
    devices::Devices,
    error::Chip8Result,
    interp::Flow,
};

/// Drives a [`Chip8Cpu`] against a set of [`Devices`].
///
/// Instructions execute at the configured clock frequency, while the
/// delay and sound timers count down at a fixed [`DELAY_FREQUENCY`]
/// measured in wall-clock time, regardless of how fast instructions run.
pub struct Chip8Vm {
    cpu: Chip8Cpu,
    clock: Option<Clock>,
    timer: Clock,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        Self::with_cpu(Chip8Cpu::new(), conf)
    }

    /// Drive an existing CPU, for example one created with a fixed random seed.
    pub fn with_cpu(cpu: Chip8Cpu, conf: Chip8Conf) -> Self {
        Chip8Vm {
            cpu,
            clock: conf
                .clock_frequency
                .filter(|hz| hz.0 > 0)
                .map(|hz| Clock::new(hz.into())),
            timer: Clock::from_hz(DELAY_FREQUENCY),
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Chip8Cpu {
        &mut self.cpu
    }

    /// Reset the machine and load a fresh program.
    ///
    /// A program that doesn't fit is rejected before anything is touched,
    /// so the machine keeps running whatever it had loaded.
    pub fn load_program(&mut self, program: &[u8]) -> Chip8Result<()> {
        check_program_size(program)?;

        // Start with clean memory to avoid leaking previous program.
        self.reset();
        self.cpu.load_program(program)
    }

    /// Clear internal state in preparation for a fresh startup.
    pub fn reset(&mut self) {
        self.cpu.reset();
        if let Some(clock) = self.clock.as_mut() {
            clock.reset();
        }
        self.timer.reset();
    }
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct Chip8Conf {
    /// Instructions per second. Unthrottled when not set.
    #[cfg_attr(feature = "serde", serde(default))]
    pub clock_frequency: Option<Hz>,
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(transparent))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Chip8Vm {
    /// Execute a single cycle against the given devices.
    ///
    /// 1. Waits for the CPU clock when throttled.
    /// 2. Samples keyboard input.
    /// 3. Counts down the timers once for every 60Hz period elapsed since the
    ///    last step, emitting a tone when the sound timer expires.
    /// 4. Executes one instruction.
    /// 5. Renders the display if it changed.
    pub fn step(&mut self, devices: &mut impl Devices) -> Chip8Result<Flow> {
        if let Some(clock) = self.clock.as_mut() {
            clock.wait();
        }

        self.cpu.set_keys(devices.poll_input());

        for _ in 0..self.timer.ticks() {
            if self.cpu.tick_timers() {
                devices.play_tone();
            }
        }

        let flow = self.cpu.execute_cycle().map_err(|err| {
            log::error!("{err}");
            err
        })?;

        if self.cpu.take_draw_flag() {
            devices.render_frame(self.cpu.display());
        }

        Ok(flow)
    }

    /// Execute up to `step_count` cycles, stopping at the first error.
    pub fn run_steps(&mut self, step_count: usize, devices: &mut impl Devices) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step(devices)?;
        }

        Ok(flow)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::devices::{KeyCode, KeyState};

    #[derive(Default)]
    struct MockDevices {
        frames: usize,
        tones: usize,
        keys: KeyState,
        last_frame: Vec<u8>,
    }

    impl Devices for MockDevices {
        fn render_frame(&mut self, pixels: &[u8; DISPLAY_BUFFER_SIZE]) {
            self.frames += 1;
            self.last_frame = pixels.to_vec();
        }

        fn poll_input(&mut self) -> KeyState {
            self.keys
        }

        fn play_tone(&mut self) {
            self.tones += 1;
        }
    }

    #[test]
    fn test_clock_hz() {
        let interval: Duration = Hz(60).into();
        assert_eq!(interval.as_millis(), 16);

        let interval: Duration = Hz(0).into();
        assert_eq!(interval, Duration::ZERO);
    }

    #[test]
    #[rustfmt::skip]
    fn test_step_renders_on_draw() {
        let mut vm = Chip8Vm::with_cpu(Chip8Cpu::with_seed(0), Chip8Conf::default());
        vm.load_program(&[
            0x60, 0x0A, // LD v0, 0xA
            0xF0, 0x29, // LD F, v0
            0xD1, 0x15, // DRW v1, v1, 5
            0x12, 0x06, // JP 0x206
        ]).unwrap();
        let mut devices = MockDevices::default();

        vm.run_steps(2, &mut devices).unwrap();
        assert_eq!(devices.frames, 0);

        assert_eq!(vm.step(&mut devices).unwrap(), Flow::Draw);
        assert_eq!(devices.frames, 1);
        assert!(!vm.cpu().draw_flag());
        // Top row of the "A" glyph.
        assert_eq!(&devices.last_frame[0..5], &[1, 1, 1, 1, 0]);

        assert_eq!(vm.run_steps(10, &mut devices).unwrap(), Flow::Jump);
        assert_eq!(devices.frames, 1);
    }

    #[test]
    fn test_step_forwards_input() {
        let mut vm = Chip8Vm::with_cpu(Chip8Cpu::with_seed(0), Chip8Conf::default());
        vm.load_program(&[0xF4, 0x0A]).unwrap();
        let mut devices = MockDevices::default();

        assert_eq!(vm.step(&mut devices).unwrap(), Flow::KeyWait);

        devices.keys[KeyCode::KeyC.index()] = true;
        assert_eq!(vm.step(&mut devices).unwrap(), Flow::Ok);
        assert_eq!(vm.cpu().register(4), 0xC);
    }

    #[test]
    fn test_step_polls_input_after_clock_wait() {
        struct PollTime(Option<std::time::Instant>);

        impl Devices for PollTime {
            fn render_frame(&mut self, _pixels: &[u8; DISPLAY_BUFFER_SIZE]) {}

            fn poll_input(&mut self) -> KeyState {
                self.0 = Some(std::time::Instant::now());
                [false; KEY_COUNT]
            }

            fn play_tone(&mut self) {}
        }

        let conf = Chip8Conf {
            clock_frequency: Some(Hz(10)),
        };
        let mut vm = Chip8Vm::with_cpu(Chip8Cpu::with_seed(0), conf);
        vm.load_program(&[0x12, 0x00]).unwrap();
        let mut devices = PollTime(None);

        let start = std::time::Instant::now();
        vm.step(&mut devices).unwrap();
        let polled = devices.0.expect("input polled").duration_since(start);
        assert!(polled >= Duration::from_millis(90), "polled after {polled:?}");
    }

    #[test]
    fn test_step_error() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_program(&[0xFF, 0xFF]).unwrap();
        let mut devices = MockDevices::default();

        assert!(vm.run_steps(3, &mut devices).is_err());
        assert_eq!(vm.cpu().pc(), 0x200);
    }

    #[test]
    fn test_load_program_resets() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_program(&[0x60, 0x01, 0x12, 0x02]).unwrap();
        vm.run_steps(2, &mut MockDevices::default()).unwrap();
        assert_eq!(vm.cpu().register(0), 1);

        vm.load_program(&[0x00, 0xE0]).unwrap();
        assert_eq!(vm.cpu().register(0), 0);
        assert_eq!(vm.cpu().pc(), 0x200);
        assert_eq!(vm.cpu().memory()[0x202], 0);
    }

    #[test]
    fn test_load_program_too_large_keeps_machine() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_program(&[0x60, 0x07, 0xA2, 0x34, 0x12, 0x04]).unwrap();
        vm.run_steps(3, &mut MockDevices::default()).unwrap();

        let registers = *vm.cpu().registers();
        let memory = vm.cpu().memory().to_vec();
        let (pc, index) = (vm.cpu().pc(), vm.cpu().index());

        match vm.load_program(&vec![0xAB; MAX_PROGRAM_SIZE + 1]) {
            Err(crate::error::Chip8Error::ProgramTooLarge { size, .. }) => {
                assert_eq!(size, MAX_PROGRAM_SIZE + 1)
            }
            other => panic!("unexpected result: {other:?}"),
        }

        assert_eq!(vm.cpu().registers(), &registers);
        assert_eq!(vm.cpu().memory().as_slice(), memory.as_slice());
        assert_eq!(vm.cpu().pc(), pc);
        assert_eq!(vm.cpu().index(), index);
        assert_eq!(vm.cpu().register(0), 7);
    }

    /// Run a spin loop for one second at the given CPU rate, and return
    /// how far the delay timer counted down.
    fn delay_ticks_in_one_second(cpu_hz: u64) -> u8 {
        let conf = Chip8Conf {
            clock_frequency: Some(Hz(cpu_hz)),
        };
        let mut vm = Chip8Vm::with_cpu(Chip8Cpu::with_seed(0), conf);
        // JP 0x200
        vm.load_program(&[0x12, 0x00]).unwrap();
        vm.cpu.delay_timer = 200;
        let mut devices = MockDevices::default();

        vm.timer.reset();
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_secs(1) {
            vm.step(&mut devices).unwrap();
        }

        200 - vm.cpu().delay_timer()
    }

    #[test]
    fn test_timers_60hz_with_slow_cpu() {
        let ticks = delay_ticks_in_one_second(30);
        assert!((58..=62).contains(&ticks), "delay timer ticked {ticks} times");
    }

    #[test]
    fn test_timers_60hz_with_fast_cpu() {
        let ticks = delay_ticks_in_one_second(500);
        assert!((58..=62).contains(&ticks), "delay timer ticked {ticks} times");
    }

    #[test]
    fn test_sound_timer_emits_single_tone() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        // LD v0, 2 ; LD ST, v0 ; JP 0x204
        vm.load_program(&[0x60, 0x02, 0xF0, 0x18, 0x12, 0x04]).unwrap();
        let mut devices = MockDevices::default();
        vm.run_steps(2, &mut devices).unwrap();
        assert!(vm.cpu().is_sound_active());

        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_millis(100) {
            vm.step(&mut devices).unwrap();
        }
        assert_eq!(vm.cpu().sound_timer(), 0);
        assert_eq!(devices.tones, 1);
    }
}
