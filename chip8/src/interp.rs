//! Bytecode interpreter.
use rand::Rng;

use crate::{
    bytecode::Instr,
    constants::*,
    cpu::Chip8Cpu,
    error::{Chip8Error, Chip8Result},
};

/// Outcome of a single executed cycle, used by the driver
/// to decide what needs servicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// Display buffer was modified.
    Draw,
    /// Sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
}

impl Chip8Cpu {
    /// Fetch, decode and execute one instruction.
    ///
    /// Timers are not touched; see [`Chip8Cpu::tick_timers`].
    ///
    /// On error the program counter still points at the faulting instruction,
    /// and no other state has been changed.
    pub fn execute_cycle(&mut self) -> Chip8Result<Flow> {
        if let Some(vx) = self.key_wait {
            return Ok(self.resume_key_wait(vx));
        }

        let instr = self.fetch();
        let (vx, vy) = (instr.x(), instr.y());
        let nn = instr.nn();
        let nnn = instr.nnn();

        let flow = match instr.op() {
            0x0 => self.exec_system(instr)?,
            // 1nnn (JP addr)
            //
            // Jump to address.
            0x1 => {
                op_trace("JP", self, instr);

                self.jump(nnn);
                Flow::Jump
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at NNN.
            // The current program counter is pushed, and popped again by 00EE.
            0x2 => {
                op_trace("CALL", self, instr);

                if self.sp >= STACK_SIZE {
                    return Err(Chip8Error::StackOverflow { pc: self.pc() });
                }
                self.stack[self.sp] = self.pc as Address;
                self.sp += 1;
                self.jump(nnn);
                Flow::Jump
            }
            // 3xnn (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            0x3 => {
                op_trace("SE", self, instr);

                self.skip_if(self.registers[vx] == nn);
                Flow::Ok
            }
            // 4xnn (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            0x4 => {
                op_trace("SNE", self, instr);

                self.skip_if(self.registers[vx] != nn);
                Flow::Ok
            }
            // 5xy0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals value VY.
            0x5 if instr.n() == 0 => {
                op_trace("SE", self, instr);

                self.skip_if(self.registers[vx] == self.registers[vy]);
                Flow::Ok
            }
            // 6xnn (LD Vx, byte)
            //
            // Set register VX to value NN.
            0x6 => {
                op_trace("LD", self, instr);

                self.registers[vx] = nn;
                self.advance();
                Flow::Ok
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            0x7 => {
                op_trace("ADD", self, instr);

                self.registers[vx] = self.registers[vx].wrapping_add(nn);
                self.advance();
                Flow::Ok
            }
            // Arithmetic instructions indentified by n
            0x8 => self.exec_math(instr)?,
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            0x9 if instr.n() == 0 => {
                op_trace("SNE", self, instr);

                self.skip_if(self.registers[vx] != self.registers[vy]);
                Flow::Ok
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value NNN.
            0xA => {
                op_trace("LD I", self, instr);

                self.address = nnn;
                self.advance();
                Flow::Ok
            }
            // Bnnn (JP V0, addr)
            //
            // Jump to address NNN offset by V0.
            0xB => {
                op_trace("JP V0", self, instr);

                self.jump(self.registers[0] as u16 + nnn);
                Flow::Jump
            }
            // Cxnn (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and NN.
            0xC => {
                op_trace("RND", self, instr);

                self.registers[vx] = nn & self.rng.gen::<u8>();
                self.advance();
                Flow::Ok
            }
            0xD => self.exec_draw(instr),
            // Miscellaneous instructions identified by nn
            0xE | 0xF => self.exec_misc(instr)?,
            // Unsupported operation.
            _ => return Err(self.unknown_opcode(instr)),
        };

        Ok(flow)
    }

    /// Instruction at the current program counter.
    #[inline(always)]
    fn fetch(&self) -> Instr {
        Instr::from_bytes([self.ram[self.pc & MEM_MASK], self.ram[(self.pc + 1) & MEM_MASK]])
    }

    #[inline(always)]
    fn advance(&mut self) {
        self.pc = (self.pc + 2) & MEM_MASK;
    }

    /// Advance past the next instruction when the condition holds.
    #[inline(always)]
    fn skip_if(&mut self, cond: bool) {
        let step = if cond { 4 } else { 2 };
        self.pc = (self.pc + step) & MEM_MASK;
    }

    #[inline(always)]
    fn jump(&mut self, address: Address) {
        self.pc = address as usize & MEM_MASK;
    }

    /// Memory location relative to the address register I, wrapped to memory size.
    #[inline(always)]
    fn addr(&self, offset: usize) -> usize {
        (self.address as usize + offset) & MEM_MASK
    }

    fn unknown_opcode(&self, instr: Instr) -> Chip8Error {
        Chip8Error::UnknownOpcode {
            opcode: instr.word(),
            pc: self.pc(),
        }
    }

    /// Check for a keypress while stalled on `Fx0A`.
    fn resume_key_wait(&mut self, vx: usize) -> Flow {
        match self.last_key() {
            Some(k) => {
                self.registers[vx] = k;
                self.key_wait = None;
                self.advance();
                Flow::Ok
            }
            None => Flow::KeyWait,
        }
    }

    /// Execute a system instruction
    #[inline]
    fn exec_system(&mut self, instr: Instr) -> Chip8Result<Flow> {
        match instr.word() {
            // 00E0 (CLS)
            //
            // Clear display
            0x00E0 => {
                op_trace("CLS", self, instr);

                self.clear_display();
                self.advance();
                Ok(Flow::Draw)
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Pop the call site from the stack, and continue after it.
            0x00EE => {
                op_trace("RET", self, instr);

                if self.sp == 0 {
                    return Err(Chip8Error::StackUnderflow { pc: self.pc() });
                }
                self.sp -= 1;
                self.pc = self.stack[self.sp] as usize;
                self.advance();
                Ok(Flow::Jump)
            }
            // 0nnn (SYS addr) jumps to native machine code, which can't be emulated.
            _ => Err(self.unknown_opcode(instr)),
        }
    }

    /// Execute an arithmetic instruction
    #[inline]
    fn exec_math(&mut self, instr: Instr) -> Chip8Result<Flow> {
        debug_assert_eq!(instr.op(), 0x8);

        let (vx, vy) = (instr.x(), instr.y());
        let (x, y) = (self.registers[vx], self.registers[vy]);

        match instr.n() {
            // 8xy0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            0x0 => {
                op_trace("LD", self, instr);

                self.registers[vx] = y;
            }
            // 8xy1 (OR Vx, Vy)
            0x1 => {
                op_trace("OR", self, instr);

                self.registers[vx] = x | y;
            }
            // 8xy2 (AND Vx, Vy)
            0x2 => {
                op_trace("AND", self, instr);

                self.registers[vx] = x & y;
            }
            // 8xy3 (XOR Vx, Vy)
            0x3 => {
                op_trace("XOR", self, instr);

                self.registers[vx] = x ^ y;
            }
            // 8xy4 (ADD Vx, Vy)
            //
            // Adds VY to VX, and stores the result in VX.
            // If overflow, set VF to 1, else 0.
            0x4 => {
                op_trace("ADD", self, instr);

                let (result, carry) = x.overflowing_add(y);
                self.registers[FLAG_REGISTER] = carry as u8;
                self.registers[vx] = result;
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // Subtracts VY from VX, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            0x5 => {
                op_trace("SUB", self, instr);

                self.registers[FLAG_REGISTER] = (x >= y) as u8;
                self.registers[vx] = x.wrapping_sub(y);
            }
            // 8xy6 (SHR Vx)
            //
            // Least-significant bit of VX goes into VF.
            // VY is unused.
            0x6 => {
                op_trace("SHR", self, instr);

                self.registers[FLAG_REGISTER] = x & 1;
                self.registers[vx] = x >> 1;
            }
            // 8xy7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            0x7 => {
                op_trace("SUBN", self, instr);

                self.registers[FLAG_REGISTER] = (y >= x) as u8;
                self.registers[vx] = y.wrapping_sub(x);
            }
            // 8xyE (SHL Vx)
            //
            // Most-significant bit of VX goes into VF.
            // VY is unused.
            0xE => {
                op_trace("SHL", self, instr);

                self.registers[FLAG_REGISTER] = x >> 7;
                self.registers[vx] = x << 1;
            }
            _ => return Err(self.unknown_opcode(instr)),
        }

        self.advance();
        Ok(Flow::Ok)
    }

    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
    /// Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
    /// memory pointed to by address register I.
    ///
    /// If the sprite is drawn outside of the display area, it is wrapped around to the other side.
    ///
    /// If the drawing operation erases existing pixels in the display buffer, register VF is set to
    /// 1, and set to 0 if no display bits are unset. This is used for collision detection.
    fn exec_draw(&mut self, instr: Instr) -> Flow {
        op_trace("DRW", self, instr);

        let x = self.registers[instr.x()] as usize;
        let y = self.registers[instr.y()] as usize;
        let mut is_erased = false;

        for r in 0..instr.n() as usize {
            // Each row is 8 bits representing the 8 pixels of the sprite.
            let row = self.ram[self.addr(r)];

            for c in 0..8 {
                if (row >> (7 - c)) & 1 == 0 {
                    continue;
                }

                let d = ((x + c) % DISPLAY_WIDTH) + ((y + r) % DISPLAY_HEIGHT) * DISPLAY_WIDTH;

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= self.display[d] == 1;
                self.display[d] ^= 1;
            }
        }

        self.registers[FLAG_REGISTER] = is_erased as u8;
        self.draw_flag = true;
        self.advance();

        Flow::Draw
    }

    /// Execute a miscellaneous instruction
    #[inline]
    fn exec_misc(&mut self, instr: Instr) -> Chip8Result<Flow> {
        let vx = instr.x();
        let mut control_flow = Flow::Ok;

        match (instr.op(), instr.nn()) {
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            //
            // Skip next instruction if the key with the value of Vx is pressed.
            (0xE, 0x9E) => {
                op_trace("SKP", self, instr);

                let key = self.registers[vx] as usize & 0xF;
                self.skip_if(self.keys[key]);
                return Ok(control_flow);
            }
            // ExA1 (SKNP Vx)
            (0xE, 0xA1) => {
                op_trace("SKNP", self, instr);

                let key = self.registers[vx] as usize & 0xF;
                self.skip_if(!self.keys[key]);
                return Ok(control_flow);
            }
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            (0xF, 0x07) => {
                op_trace("LD DT", self, instr);

                self.registers[vx] = self.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // All execution stops until a key is pressed.
            (0xF, 0x0A) => {
                op_trace("LD K", self, instr);

                self.key_wait = Some(vx);
                return Ok(self.resume_key_wait(vx));
            }
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            (0xF, 0x15) => {
                op_trace("LD DT", self, instr);

                self.delay_timer = self.registers[vx];
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            (0xF, 0x18) => {
                op_trace("LD ST", self, instr);

                self.sound_timer = self.registers[vx];
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I. VF is not affected.
            (0xF, 0x1E) => {
                op_trace("ADD I", self, instr);

                self.address = self.address.wrapping_add(self.registers[vx] as u16);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            (0xF, 0x29) => {
                op_trace("LD F", self, instr);

                let x = self.registers[vx] as u16;
                self.address = FONTSET_START as u16 + x * FONTSET_HEIGHT as u16;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            (0xF, 0x33) => {
                op_trace("LD B", self, instr);

                let x = self.registers[vx];
                let (a, b, c) = (self.addr(0), self.addr(1), self.addr(2));
                self.ram[a] = x / 100;
                self.ram[b] = x / 10  % 10;
                self.ram[c] = x       % 10;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            // I itself is left unmodified.
            (0xF, 0x55) => {
                op_trace("LD [I]", self, instr);

                for v in 0..=vx {
                    let a = self.addr(v);
                    self.ram[a] = self.registers[v];
                }
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            (0xF, 0x65) => {
                op_trace("LD Vx, [I]", self, instr);

                for v in 0..=vx {
                    self.registers[v] = self.ram[self.addr(v)];
                }
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => return Err(self.unknown_opcode(instr)),
        }

        self.advance();
        Ok(control_flow)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(name: &str, cpu: &Chip8Cpu, instr: Instr) {
    log::trace!("{:04X}: {:04X} {}", cpu.pc, instr.word(), name);
}

#[cfg(not(feature = "op_trace"))]
#[inline(always)]
fn op_trace(_: &str, _: &Chip8Cpu, _: Instr) {}
