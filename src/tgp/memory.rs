//! Host-visible memories read by the geometry stage

use super::lighting::ColorTables;

/// Mutable polygon RAM size in dwords
pub const POLY_RAM_WORDS: usize = 0x40_0000;

/// Address bit selecting polygon RAM over the static ROM
pub const POLY_RAM_BANK: u32 = 0x80_0000;

/// Texture-index memory size in 16-bit cells
pub const TEXRAM_WORDS: usize = 0xC_0000;

/// Bias subtracted from texture addresses
pub const TEXRAM_BASE: u32 = 0x4_0000;

pub const PALETTE_ENTRIES: usize = 0x2000;

/// Polygon data: static ROM supplied by the host, plus uploadable RAM
pub struct PolygonMemory {
    ram: Vec<u32>,
    rom: Vec<u32>,
}

impl PolygonMemory {
    pub fn new() -> Self {
        Self {
            ram: vec![0; POLY_RAM_WORDS],
            rom: Vec::new(),
        }
    }

    pub fn set_rom(&mut self, rom: Vec<u32>) {
        self.rom = rom;
    }

    /// Read one dword; the bank bit picks RAM, ROM reads past the end are 0
    pub fn read(&self, addr: u32) -> u32 {
        if addr & POLY_RAM_BANK != 0 {
            self.ram[(addr as usize) & (POLY_RAM_WORDS - 1)]
        } else {
            self.rom.get((addr & 0x7f_ffff) as usize).copied().unwrap_or(0)
        }
    }

    pub fn read_f32(&self, addr: u32) -> f32 {
        f32::from_bits(self.read(addr))
    }

    /// Write to RAM at a RAM-relative index
    pub fn write_ram(&mut self, index: u32, value: u32) {
        self.ram[(index as usize) & (POLY_RAM_WORDS - 1)] = value;
    }
}

impl Default for PolygonMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Texture-index memory: one palette index per texture address
pub struct TextureRam {
    cells: Vec<u16>,
}

impl TextureRam {
    pub fn new() -> Self {
        Self { cells: vec![0; TEXRAM_WORDS] }
    }

    fn index(addr: u32) -> usize {
        (addr.wrapping_sub(TEXRAM_BASE) as usize) % TEXRAM_WORDS
    }

    /// Look up by biased texture address
    pub fn read(&self, addr: u32) -> u16 {
        self.cells[Self::index(addr)]
    }

    pub fn write(&mut self, addr: u32, value: u16) {
        self.cells[Self::index(addr)] = value;
    }
}

impl Default for TextureRam {
    fn default() -> Self {
        Self::new()
    }
}

/// RGB555 palette
pub struct Palette {
    entries: Vec<u16>,
}

impl Palette {
    pub fn new() -> Self {
        Self { entries: vec![0; PALETTE_ENTRIES] }
    }

    pub fn get(&self, index: usize) -> u16 {
        self.entries[index & (PALETTE_ENTRIES - 1)]
    }

    pub fn set(&mut self, index: usize, rgb555: u16) {
        self.entries[index & (PALETTE_ENTRIES - 1)] = rgb555;
    }

    /// Copy a block starting at `start`, wrapping at the end
    pub fn load(&mut self, start: usize, data: &[u16]) {
        for (i, &v) in data.iter().enumerate() {
            self.set(start + i, v);
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

/// All host-populated memories, owned together by the coprocessor
#[derive(Default)]
pub struct Memories {
    pub poly: PolygonMemory,
    pub texram: TextureRam,
    pub palette: Palette,
    pub tables: ColorTables,
}
