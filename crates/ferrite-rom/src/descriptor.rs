use tracing::debug;

use crate::chips::{classify, is_pal_region, ClassifyInput, Coprocessor};
use crate::header::{locate_header, Header, EXHIROM_HEADER, HIROM_HEADER};

/// Length of the foreign copier header some dumps are prefixed with.
pub const COPIER_HEADER_LEN: usize = 512;

/// Memory-mapping scheme, derived from where the header was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    LoRom,
    HiRom,
    ExHiRom,
}

impl Mapping {
    fn from_header_offset(offset: usize) -> Mapping {
        match offset {
            HIROM_HEADER => Mapping::HiRom,
            EXHIROM_HEADER => Mapping::ExHiRom,
            _ => Mapping::LoRom,
        }
    }

    fn code(self) -> u8 {
        match self {
            Mapping::LoRom => 0,
            Mapping::HiRom => 1,
            Mapping::ExHiRom => 2,
        }
    }
}

/// Cartridge metadata recovered from a raw image.
///
/// Recomputed from scratch on every image load. When no header was located
/// (`header_offset` is `None`) only `image_size` is meaningful and
/// consumers fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomDescriptor {
    /// Rounded-up power-of-two size class, `ceil(log2(image_size)) - 10`.
    pub rom_size_log2: u8,
    /// RAM size class after chip overrides.
    pub ram_size: u8,
    pub mapping: Mapping,
    pub chip: Coprocessor,
    pub rtc: bool,
    pub pal: bool,
    /// Located header offset within the stripped image.
    pub header_offset: Option<u32>,
    /// Image size in bytes after copier-header stripping.
    pub image_size: u32,
}

impl RomDescriptor {
    fn unknown(image_size: u32) -> RomDescriptor {
        RomDescriptor {
            rom_size_log2: 0,
            ram_size: 0,
            mapping: Mapping::LoRom,
            chip: Coprocessor::None,
            rtc: false,
            pal: false,
            header_offset: None,
            image_size,
        }
    }

    /// Pack the descriptor into the 12-byte record the core loader
    /// consumes:
    ///
    /// ```text
    /// 0      (ram_size << 4) | rom_size_log2
    /// 1      mapping code | chip code | RTC bit (0x08)
    /// 2      reserved
    /// 3      bit 0: PAL
    /// 4..8   header offset, u32 LE (0 when not found)
    /// 8..12  image size, u32 LE
    /// ```
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut raw = [0u8; 12];
        raw[8..12].copy_from_slice(&self.image_size.to_le_bytes());
        let Some(offset) = self.header_offset else {
            return raw;
        };
        raw[0] = (self.ram_size << 4) | (self.rom_size_log2 & 0x0f);
        raw[1] = self.mapping.code() | self.chip.legacy_code();
        if self.rtc {
            raw[1] |= 0x08;
        }
        raw[3] = u8::from(self.pal);
        raw[4..8].copy_from_slice(&offset.to_le_bytes());
        raw
    }
}

/// Strip the foreign copier header when present. Presence is signaled by
/// the image length leaving a 512-byte remainder against the 1 KiB grid.
pub fn strip_copier_header(image: &[u8]) -> &[u8] {
    if image.len() & COPIER_HEADER_LEN != 0 {
        &image[COPIER_HEADER_LEN..]
    } else {
        image
    }
}

/// Analyze a raw image: strip a copier header, locate and decode the
/// cartridge header, classify the peripheral, and assemble the descriptor.
pub fn analyze(image: &[u8]) -> RomDescriptor {
    let body = strip_copier_header(image);
    let image_size = body.len() as u32;

    let Some(offset) = locate_header(body) else {
        return RomDescriptor::unknown(image_size);
    };
    let Some(header) = Header::parse(body, offset) else {
        return RomDescriptor::unknown(image_size);
    };

    let size_class = rom_size_class(image_size);
    debug!(
        header_rom_size = header.rom_size,
        size_class, "rom size class computed from image length"
    );

    let mut ram_size = header.ram_size;
    if ram_size >= 0x08 {
        ram_size = 0;
    }

    let chips = classify(&ClassifyInput {
        mapper: header.mapper,
        rom_type: header.rom_type,
        company: header.company,
        rom_size: header.rom_size,
        size_class,
        expansion_ram: body[offset - 3],
    });
    if let Some(size) = chips.ram_size {
        ram_size = size;
    }

    RomDescriptor {
        rom_size_log2: size_class,
        ram_size,
        mapping: Mapping::from_header_offset(offset),
        chip: chips.chip,
        rtc: chips.rtc,
        pal: is_pal_region(header.region),
        header_offset: Some(offset as u32),
        image_size,
    }
}

/// Rounded-up power-of-two size class: the smallest `class` such that
/// `image_size <= 1 << (class + 10)`, computed the way the legacy loader
/// did (shift `size - 1` up until bit 24 is set, starting from 15).
fn rom_size_class(image_size: u32) -> u8 {
    let mut class = 15u8;
    let mut scaled = image_size.wrapping_sub(1);
    if scaled & 0xff00_0000 == 0 {
        while class > 0 && scaled & 0x0100_0000 == 0 {
            class -= 1;
            scaled <<= 1;
        }
    }
    class
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_rounds_up_to_powers_of_two() {
        assert_eq!(rom_size_class(1 << 20), 10); // 1 MiB
        assert_eq!(rom_size_class((1 << 20) + 1), 11);
        assert_eq!(rom_size_class(1 << 21), 11); // 2 MiB
        assert_eq!(rom_size_class(1 << 22), 12);
        assert_eq!(rom_size_class(0x30_0000), 12); // 3 MiB rounds to 4 MiB
        assert_eq!(rom_size_class(1 << 24), 14);
        assert_eq!(rom_size_class(1 << 25), 15);
    }

    #[test]
    fn copier_header_stripped_only_on_remainder_lengths() {
        let plain = vec![0u8; 0x8000];
        assert_eq!(strip_copier_header(&plain).len(), 0x8000);

        let prefixed = vec![0u8; 0x8000 + COPIER_HEADER_LEN];
        assert_eq!(strip_copier_header(&prefixed).len(), 0x8000);
    }

    #[test]
    fn unknown_image_populates_size_only() {
        let descriptor = analyze(&vec![0u8; 0x8000]);
        assert_eq!(descriptor.header_offset, None);
        assert_eq!(descriptor.image_size, 0x8000);

        let raw = descriptor.to_bytes();
        assert_eq!(&raw[..8], &[0u8; 8]);
        assert_eq!(&raw[8..12], &0x8000u32.to_le_bytes());
    }

    #[test]
    fn to_bytes_packs_the_legacy_layout() {
        let descriptor = RomDescriptor {
            rom_size_log2: 11,
            ram_size: 3,
            mapping: Mapping::HiRom,
            chip: Coprocessor::Dsp1,
            rtc: false,
            pal: true,
            header_offset: Some(0xffc0),
            image_size: 0x20_0000,
        };
        let raw = descriptor.to_bytes();
        assert_eq!(raw[0], 0x3b);
        assert_eq!(raw[1], 0x81);
        assert_eq!(raw[2], 0x00);
        assert_eq!(raw[3], 0x01);
        assert_eq!(&raw[4..8], &0xffc0u32.to_le_bytes());
        assert_eq!(&raw[8..12], &0x20_0000u32.to_le_bytes());
    }

    #[test]
    fn rtc_flag_sets_bit_three_of_the_mapping_byte() {
        let descriptor = RomDescriptor {
            rom_size_log2: 12,
            ram_size: 0,
            mapping: Mapping::ExHiRom,
            chip: Coprocessor::Spc7110,
            rtc: true,
            pal: false,
            header_offset: Some(0x40_ffc0),
            image_size: 0x40_0000,
        };
        assert_eq!(descriptor.to_bytes()[1], 0xda);
    }
}
