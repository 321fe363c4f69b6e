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

//! Packing of the host calendar time into display register values.
//!
//! All functions are pure: the same input always yields the same requests.

use chrono::{Datelike, Timelike};
use crate::preferences::{ClockMode, DateField, DateFieldOrder, DisplayPreferences};
use crate::usb::definitions::{ClockRequest, X52RegisterIndex};

const CLOCK_24H_FLAG: u16 = 1 << 15;

/// Encodes the primary clock: minutes in the low byte, hours (0-23) in the high byte and
/// bit 15 set for the 24-hour mode.
pub fn encode_time(hour: u8, minute: u8, clock_mode: ClockMode) -> ClockRequest {
    let mut value = u16::from(minute) | (u16::from(hour) << 8);
    value &= !CLOCK_24H_FLAG;
    if clock_mode == ClockMode::TwentyFourHour {
        value |= CLOCK_24H_FLAG;
    }
    ClockRequest::new(value, X52RegisterIndex::PrimaryClock)
}

/// Encodes the date registers for the given order code, falling back to `ddmmyy` as a whole
/// when the code is malformed.
pub fn encode_date(day: u8, month: u8, year: u16, date_field_order: &str) -> [ClockRequest; 2] {
    encode_date_with_order(day, month, year, DateFieldOrder::from_preference(date_field_order))
}

/// Encodes the date registers: the first two fields go to the low and high byte of the
/// day/month register, the third one to the year register as a plain 16-bit number.
pub fn encode_date_with_order(day: u8, month: u8, year: u16, order: DateFieldOrder) -> [ClockRequest; 2] {
    let [first, second, third] = order.fields().map(|field| match field {
        DateField::Day => u16::from(day),
        DateField::Month => u16::from(month),
        DateField::Year => year,
    });

    let day_month = (first & 0x00FF) | ((second & 0x00FF) << 8);
    [
        ClockRequest::new(day_month, X52RegisterIndex::DateDayMonth),
        ClockRequest::new(third, X52RegisterIndex::DateYear),
    ]
}

/// Full update sequence in transmission order: time, day/month, year.
pub fn encode_clock_update<T>(timestamp: &T, preferences: &DisplayPreferences) -> [ClockRequest; 3]
where
    T: Datelike + Timelike,
{
    let time = encode_time(timestamp.hour() as u8, timestamp.minute() as u8, preferences.clock_mode);
    let year = timestamp.year().clamp(0, i32::from(u16::MAX)) as u16;
    let [day_month, year] = encode_date_with_order(timestamp.day() as u8,
                                                   timestamp.month() as u8,
                                                   year,
                                                   preferences.date_field_order);
    [time, day_month, year]
}
