// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.


//! 24 bit two's complement frames as shifted out of the load cell ADC.

pub const VALID_DATA_BITS: usize = 24;

const DATA_MASK: u32 = (1 << VALID_DATA_BITS) - 1;
const SIGN_BIT: u32 = 1 << (VALID_DATA_BITS - 1);

pub const MIN_READING: i32 = -(1 << (VALID_DATA_BITS - 1));
pub const MAX_READING: i32 = (1 << (VALID_DATA_BITS - 1)) - 1;

/// Bits exactly as shifted in from the data line, MSB first. Anything above bit 23 is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame(u32);

impl RawFrame {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & DATA_MASK)
    }

    /// Two's complement encoding of `value`. Values outside the 24 bit range wrap.
    pub const fn encode(value: i32) -> Self {
        Self::from_bits(value as u32)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Sign extend bit 23 into the upper byte.
    pub const fn decode(&self) -> i32 {
        if self.0 & SIGN_BIT != 0 {
            (self.0 | !DATA_MASK) as i32
        } else {
            self.0 as i32
        }
    }
}
