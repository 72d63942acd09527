//! rustnsf: a MOS 6502 interpreter core for NSF (NES Sound Format) playback.
//!
//! An NSF file packages 6502 music code extracted from an NES game together
//! with `init` and `play` entry points. This crate provides the pieces needed
//! to run one: a flat 64KB memory, an instruction-accurate 6502 interpreter,
//! the NSF container parser, and a player that arms the interpreter and
//! drives the "call init, then repeatedly call play" convention.
//!
//! The interpreter counts instructions, not cycles, and implements the
//! official opcode set only. The APU registers at $4000-$4017 are writable
//! plain memory; no sound is synthesized here.
//!
//! ## Modules
//!
//! - **memory** - flat 64KB address space with wrap-around arithmetic
//! - **cpu** - registers, flags, addressing modes, opcode dispatch, `step()`
//! - **nsf** - bit-exact parse of the 128-byte NSF header and program body
//! - **player** - NSF pre-run sequence, init/play trampoline, observers

pub mod cpu;
pub mod memory;
pub mod nsf;
pub mod player;
