// VibraWatch — Character LCD Driver
//
// HD44780 panel behind a PCF8574 I2C backpack, driven in 4-bit mode over the
// shared bus.  Every write is mirrored to the log so a device without a panel
// still reports on the console.

use esp_idf_hal::delay::{Ets, FreeRtos};

use crate::config::*;
use crate::display::{fit_line, FeedbackDisplay};
use crate::drivers::SharedBus;

// PCF8574 bit assignments
const BIT_RS: u8 = 0x01;
const BIT_EN: u8 = 0x04;
const BIT_BACKLIGHT: u8 = 0x08;

// HD44780 commands
const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x06;      // increment, no shift
const CMD_DISPLAY_ON: u8 = 0x0C;      // display on, cursor off, blink off
const CMD_FUNCTION_SET: u8 = 0x28;    // 4-bit, 2 lines, 5x8 font
const CMD_SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

pub struct CharLcd {
    bus: SharedBus,
    kind: LcdKind,
    cols: u8,
    rows: u8,
    enabled: bool,
}

impl CharLcd {
    pub fn new(bus: SharedBus, kind: LcdKind) -> Self {
        let (cols, rows) = kind.dimensions();
        Self { bus, kind, cols, rows, enabled: false }
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    /// Power-on initialisation sequence.  With `LcdKind::None` only the
    /// console mirror is active.
    pub fn init(&mut self) -> anyhow::Result<()> {
        if self.kind == LcdKind::None {
            log::info!("LCD mode: none (console only)");
            return Ok(());
        }

        FreeRtos::delay_ms(50);
        // Force 8-bit mode three times, then switch to 4-bit.
        for _ in 0..3 {
            self.write_nibble(0x30, 0)?;
            FreeRtos::delay_ms(5);
        }
        self.write_nibble(0x20, 0)?;

        self.command(CMD_FUNCTION_SET)?;
        self.command(CMD_DISPLAY_ON)?;
        self.command(CMD_CLEAR)?;
        FreeRtos::delay_ms(2);
        self.command(CMD_ENTRY_MODE)?;

        self.enabled = true;
        log::info!("LCD initialised ({}x{})", self.cols, self.rows);
        Ok(())
    }

    fn expander_write(&self, byte: u8) -> anyhow::Result<()> {
        let mut bus = self.bus.lock().map_err(|_| anyhow::anyhow!("I2C bus poisoned"))?;
        bus.write(I2C_ADDR_LCD, &[byte | BIT_BACKLIGHT], I2C_TIMEOUT_TICKS)?;
        Ok(())
    }

    /// Clock the upper nibble of `nibble` into the controller.
    fn write_nibble(&self, nibble: u8, mode: u8) -> anyhow::Result<()> {
        let data = (nibble & 0xF0) | mode;
        self.expander_write(data | BIT_EN)?;
        Ets::delay_us(1);
        self.expander_write(data)?;
        Ets::delay_us(50);
        Ok(())
    }

    fn send(&self, value: u8, mode: u8) -> anyhow::Result<()> {
        self.write_nibble(value & 0xF0, mode)?;
        self.write_nibble(value << 4, mode)
    }

    fn command(&self, cmd: u8) -> anyhow::Result<()> {
        self.send(cmd, 0)
    }

    fn set_cursor(&self, col: u8, row: u8) -> anyhow::Result<()> {
        let offset = ROW_OFFSETS[usize::from(row) % ROW_OFFSETS.len()];
        self.command(CMD_SET_DDRAM | (offset + col))
    }

    fn print(&self, text: &str) -> anyhow::Result<()> {
        for c in text.chars() {
            // The ROM has no glyphs outside ASCII.
            let byte = if c.is_ascii() { c as u8 } else { b'?' };
            self.send(byte, BIT_RS)?;
        }
        Ok(())
    }

    fn write_row(&self, col: u8, row: u8, text: &str) -> anyhow::Result<()> {
        self.set_cursor(0, row)?;
        self.print(&" ".repeat(usize::from(self.cols)))?;
        self.set_cursor(col, row)?;
        self.print(text)
    }
}

impl FeedbackDisplay for CharLcd {
    fn clear(&mut self) {
        log::debug!("--- LCD cleared ---");
        if !self.enabled {
            return;
        }
        if let Err(e) = self.command(CMD_CLEAR) {
            log::error!("Display error: {}", e);
        }
        FreeRtos::delay_ms(2);
    }

    fn write(&mut self, col: u8, row: u8, text: &str) {
        log::info!("[LCD {},{}] {}", col, row, text);
        if !self.enabled {
            return;
        }
        if let Some((col, row, line)) = fit_line(col, row, text, self.cols, self.rows) {
            if let Err(e) = self.write_row(col, row, &line) {
                log::error!("Display error: {}", e);
            }
        }
    }
}
