// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// USB vendor identifier of the X52 Pro.
pub const X52_PRO_VENDOR_ID: u16 = 0x06A3;

/// USB product identifier of the X52 Pro.
pub const X52_PRO_PRODUCT_ID: u16 = 0x0762;

/// `bRequest` shared by every vendor request of the multi-function display.
pub const X52_REQUEST_CODE: u8 = 0x91;

/// Represents the register indices carried in `wIndex` of the display vendor request.
///
/// Each index selects which device-internal value the accompanying `wValue` updates.
/// Only the clock and date registers are driven by the clock synchronisation; the text
/// line registers belong to the text display and are listed for completeness.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(unused)]
pub enum X52RegisterIndex {
    /// `primaryClock`: wValue low byte contains minutes, high byte hours, bit 15 set for 24-hour mode.
    PrimaryClock = 0xC0,
    /// `dateDayMonth`: wValue low byte contains the first date field, high byte the second one.
    DateDayMonth = 0xC4,
    /// `dateYear`: wValue contains the third date field.
    DateYear = 0xC8,
    /// `deleteLine1`: clears the first text line.
    DeleteLine1 = 0xD9,
    /// `deleteLine2`: clears the second text line.
    DeleteLine2 = 0xDA,
    /// `deleteLine3`: clears the third text line.
    DeleteLine3 = 0xDC,
    /// `appendLine1`: wValue contains two characters appended to the first text line.
    AppendLine1 = 0xD1,
    /// `appendLine2`: wValue contains two characters appended to the second text line.
    AppendLine2 = 0xD2,
    /// `appendLine3`: wValue contains two characters appended to the third text line.
    AppendLine3 = 0xD4,
}

impl From<X52RegisterIndex> for u16 {
    fn from(index: X52RegisterIndex) -> Self {
        index as u16
    }
}

/// Single vendor request to be sent to the display: the only variable part of the
/// control transfer, i.e. `wValue` and the destination register in `wIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockRequest {
    pub value: u16,
    pub index: X52RegisterIndex,
}

impl ClockRequest {
    pub fn new(value: u16, index: X52RegisterIndex) -> Self {
        Self { value, index }
    }
}

/// Pair of identifiers the daemon matches attached devices against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMatcher {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceMatcher {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self { vendor_id, product_id }
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl Default for DeviceMatcher {
    fn default() -> Self {
        Self::new(X52_PRO_VENDOR_ID, X52_PRO_PRODUCT_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matcher_accepts_only_x52_pro() {
        let matcher = DeviceMatcher::default();
        assert!(matcher.matches(0x06A3, 0x0762));
        assert!(!matcher.matches(0x06A3, 0x0255));
        assert!(!matcher.matches(0x0762, 0x06A3));
    }

    #[test]
    fn register_indices_match_display_protocol() {
        assert_eq!(u16::from(X52RegisterIndex::PrimaryClock), 0xC0);
        assert_eq!(u16::from(X52RegisterIndex::DateDayMonth), 0xC4);
        assert_eq!(u16::from(X52RegisterIndex::DateYear), 0xC8);
        assert_eq!(u16::from(X52RegisterIndex::AppendLine3), 0xD4);
        assert_eq!(u16::from(X52RegisterIndex::DeleteLine3), 0xDC);
    }
}
